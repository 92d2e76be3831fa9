use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

/// 256-bit key from the OS-seeded thread RNG.
fn random_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

fn main() {
    println!("JWT Secret Key Generator");
    println!("========================");

    let access = random_key();
    let refresh = random_key();

    println!();
    println!("JWT_SECRET");
    println!("  Base64: {}", STANDARD.encode(access));
    println!("  Hex:    {}", hex::encode(access));
    println!("JWT_REFRESH_SECRET");
    println!("  Base64: {}", STANDARD.encode(refresh));
    println!("  Hex:    {}", hex::encode(refresh));
    println!();
    println!("Copy these lines to your .env file:");
    println!("JWT_SECRET={}", hex::encode(access));
    println!("JWT_REFRESH_SECRET={}", hex::encode(refresh));
}

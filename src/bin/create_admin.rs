use bcrypt::{hash, DEFAULT_COST};
use dotenvy::dotenv;
use hopeline::handlers::auth::MIN_PASSWORD_LEN;
use hopeline::models::auth::{is_valid_email, UserRole};
use std::io::{self, Write};
use uuid::Uuid;

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Staff role from the first argument; admin when omitted.
fn staff_role(arg: Option<String>) -> Result<UserRole, String> {
    let role = match arg {
        Some(raw) => raw
            .parse::<UserRole>()
            .map_err(|_| format!("Unknown role '{}'. Use admin or counselor", raw))?,
        None => UserRole::Admin,
    };
    if !role.is_staff() {
        return Err("Students register through the API; use admin or counselor".to_string());
    }
    Ok(role)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let role = staff_role(std::env::args().nth(1))?;

    println!("HopeLine - Create {} account", role);
    println!("================================");

    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set in .env file")?;
    let pool = hopeline::db::create_pool(&database_url).await?;

    let name = prompt("Full name")?;
    if name.is_empty() {
        eprintln!("Name cannot be empty");
        return Ok(());
    }

    let email = prompt("Email address")?.to_lowercase();
    if !is_valid_email(&email) {
        eprintln!("Invalid email address");
        return Ok(());
    }

    let username = prompt("Username")?;
    if username.is_empty() {
        eprintln!("Username cannot be empty");
        return Ok(());
    }

    let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1 OR username = $2")
        .bind(&email)
        .bind(&username)
        .fetch_optional(&pool)
        .await?;
    if existing.is_some() {
        eprintln!("User with this email or username already exists");
        return Ok(());
    }

    print!("Password: ");
    io::stdout().flush()?;
    let password = rpassword::read_password()?;
    if password.len() < MIN_PASSWORD_LEN {
        eprintln!("Password must be at least {} characters long", MIN_PASSWORD_LEN);
        return Ok(());
    }

    print!("Password (again): ");
    io::stdout().flush()?;
    if password != rpassword::read_password()? {
        eprintln!("Passwords don't match");
        return Ok(());
    }

    let password_hash = hash(&password, DEFAULT_COST)?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (id, name, email, username, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, true)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&name)
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(role)
    .fetch_one(&pool)
    .await?;

    println!();
    println!("{} account created", role);
    println!("   ID: {}", id);
    println!("   Username: {}", username);
    println!("   Email: {}", email);
    println!("   Role: {}", role);

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_role_argument() {
        assert_eq!(staff_role(None).unwrap(), UserRole::Admin);
        assert_eq!(staff_role(Some("counselor".into())).unwrap(), UserRole::Counselor);
        assert!(staff_role(Some("student".into())).is_err());
        assert!(staff_role(Some("janitor".into())).is_err());
    }
}

use bcrypt::{hash, DEFAULT_COST};
use chrono::{Duration, Utc};
use dotenvy::dotenv;
use hopeline::models::appointment::AppointmentStatus;
use hopeline::models::assessment::{AssessmentType, Severity};
use hopeline::models::auth::UserRole;
use hopeline::models::chat::{Mood, Sender, SessionStatus, SessionType};
use hopeline::models::system_log::{LogCategory, LogLevel};
use hopeline::services::scoring::{
    gad7_severity, phq9_severity, response_items, GAD7_QUESTIONS, PHQ9_QUESTIONS,
};
use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::types::Json;
use uuid::Uuid;

struct SeedUser {
    name: &'static str,
    email: &'static str,
    username: &'static str,
    password: &'static str,
    role: UserRole,
}

const USERS: &[SeedUser] = &[
    SeedUser { name: "John Doe", email: "john@university.edu", username: "john_doe", password: "password123", role: UserRole::Student },
    SeedUser { name: "Jane Smith", email: "jane@university.edu", username: "jane_smith", password: "password123", role: UserRole::Student },
    SeedUser { name: "Mike Johnson", email: "mike@university.edu", username: "mike_j", password: "password123", role: UserRole::Student },
    SeedUser { name: "Sarah Wilson", email: "sarah@university.edu", username: "sarah_w", password: "password123", role: UserRole::Student },
    SeedUser { name: "Dr. Emily Brown", email: "emily@university.edu", username: "dr_emily", password: "password123", role: UserRole::Counselor },
    SeedUser { name: "Dr. Michael Davis", email: "michael@university.edu", username: "dr_michael", password: "password123", role: UserRole::Counselor },
    // Demo accounts used by the frontend
    SeedUser { name: "Admin User", email: "admin@university.edu", username: "admin", password: "admin123", role: UserRole::Admin },
    SeedUser { name: "Student Demo", email: "student@university.edu", username: "student_demo", password: "admin123", role: UserRole::Student },
];

const SYSTEM_LOGS: &[(LogLevel, LogCategory, &str, Option<&str>, Option<i32>, Option<&str>)] = &[
    (LogLevel::Info, LogCategory::Auth, "User login successful", Some("POST /api/auth/login"), None, None),
    (LogLevel::Info, LogCategory::Chat, "New chat session started", Some("POST /api/chat/sessions"), None, None),
    (LogLevel::Warning, LogCategory::System, "Slow request: GET /api/analytics/overview took 1200ms", Some("GET /api/analytics/overview"), Some(1200), None),
    (LogLevel::Error, LogCategory::Assessment, "Assessment submission failed", Some("POST /api/ai/assessment"), None, Some("VALIDATION_ERROR")),
];

fn random_answers(rng: &mut impl Rng, count: usize) -> Vec<u8> {
    (0..count).map(|_| rng.gen_range(0..=3)).collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("HopeLine - Seed demo data");
    println!("=========================");

    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let pool = hopeline::db::create_pool(&database_url).await?;
    let mut rng = rand::thread_rng();

    let mut tx = pool.begin().await?;

    sqlx::query("TRUNCATE system_logs, feedback, chat_messages, chat_sessions, assessments, appointments, users")
        .execute(&mut *tx)
        .await?;
    println!("Cleared existing data");

    let mut students = Vec::new();
    let mut counselors = Vec::new();
    for user in USERS {
        let id = Uuid::new_v4();
        let password_hash = hash(user.password, DEFAULT_COST)?;
        sqlx::query(
            "INSERT INTO users (id, name, email, username, password_hash, role) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.username)
        .bind(&password_hash)
        .bind(user.role)
        .execute(&mut *tx)
        .await?;

        match user.role {
            UserRole::Student => students.push(id),
            UserRole::Counselor => counselors.push(id),
            UserRole::Admin => {}
        }
    }
    println!("Created {} users", USERS.len());

    let mut completed = Vec::new();
    for _ in 0..10 {
        let (Some(&student), Some(&counselor)) = (students.choose(&mut rng), counselors.choose(&mut rng)) else {
            break;
        };
        let starts_at = Utc::now() + Duration::minutes(rng.gen_range(0..30 * 24 * 60));
        let status = if rng.gen_bool(0.7) {
            AppointmentStatus::Booked
        } else {
            AppointmentStatus::Completed
        };
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO appointments (id, student_id, counselor_id, starts_at, status) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(student)
        .bind(counselor)
        .bind(starts_at)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        if status == AppointmentStatus::Completed {
            completed.push((id, student, counselor));
        }
    }
    println!("Created 10 appointments");

    for &(appointment_id, student, counselor) in &completed {
        sqlx::query(
            "INSERT INTO feedback (id, student_id, counselor_id, appointment_id, rating, comment) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(student)
        .bind(counselor)
        .bind(appointment_id)
        .bind(rng.gen_range(1..=5_i16))
        .bind("Great session, very helpful!")
        .execute(&mut *tx)
        .await?;
    }
    println!("Created {} feedback entries", completed.len());

    let languages = ["en", "en", "hi"];
    for _ in 0..20 {
        let Some(&student) = students.choose(&mut rng) else { break };
        let session_type = *SessionType::ALL.choose(&mut rng).unwrap_or(&SessionType::Ai);
        let mood = Mood::ALL.choose(&mut rng).copied();
        let status = if rng.gen_bool(0.8) {
            SessionStatus::Completed
        } else {
            SessionStatus::Active
        };
        let session_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, student_id, session_type, duration, satisfaction, status, mood)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session_id)
        .bind(student)
        .bind(session_type)
        .bind(rng.gen_range(5..65_i32))
        .bind(rng.gen_range(1..=5_i16))
        .bind(status)
        .bind(mood)
        .execute(&mut *tx)
        .await?;

        let responder = match session_type {
            SessionType::Ai => Sender::Ai,
            SessionType::Peer => Sender::Peer,
            SessionType::Counselor => Sender::Counselor,
        };
        let language = languages.choose(&mut rng).copied().unwrap_or("en");
        for (sender, content) in [
            (Sender::Student, "Hello, I need some support"),
            (responder, "I'm here to help. What's on your mind?"),
        ] {
            sqlx::query(
                "INSERT INTO chat_messages (id, session_id, sender, content, language) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(session_id)
            .bind(sender)
            .bind(content)
            .bind(language)
            .execute(&mut *tx)
            .await?;
        }
    }
    println!("Created 20 chat sessions");

    for _ in 0..15 {
        let Some(&student) = students.choose(&mut rng) else { break };
        let assessment_type = *AssessmentType::ALL.choose(&mut rng).unwrap_or(&AssessmentType::Phq9);
        let phq_answers = random_answers(&mut rng, PHQ9_QUESTIONS.len());
        let gad_answers = random_answers(&mut rng, GAD7_QUESTIONS.len());

        let mut responses = Vec::new();
        let mut bands = Vec::new();
        if assessment_type != AssessmentType::Gad7 {
            responses.extend(response_items("phq9", &PHQ9_QUESTIONS, &phq_answers));
            bands.push(phq9_severity(phq_answers.iter().map(|a| u32::from(*a)).sum()));
        }
        if assessment_type != AssessmentType::Phq9 {
            responses.extend(response_items("gad7", &GAD7_QUESTIONS, &gad_answers));
            bands.push(gad7_severity(gad_answers.iter().map(|a| u32::from(*a)).sum()));
        }
        let total_score: u32 = bands.iter().map(|b| b.score).sum();
        let severity = bands
            .iter()
            .filter_map(|b| b.level)
            .max()
            .unwrap_or(Severity::Minimal);
        let completed_at = Utc::now() - Duration::days(rng.gen_range(0..30));

        sqlx::query(
            r#"
            INSERT INTO assessments (id, student_id, type, responses, total_score, severity, recommendations, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student)
        .bind(assessment_type)
        .bind(Json(&responses))
        .bind(total_score as i32)
        .bind(severity)
        .bind(vec![
            "Practice mindfulness".to_string(),
            "Regular exercise".to_string(),
            "Maintain sleep schedule".to_string(),
        ])
        .bind(completed_at)
        .execute(&mut *tx)
        .await?;
    }
    println!("Created 15 assessments");

    for &(level, category, message, endpoint, response_time_ms, error_code) in SYSTEM_LOGS {
        sqlx::query(
            r#"
            INSERT INTO system_logs (id, level, category, message, ip, endpoint, response_time_ms, error_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(level)
        .bind(category)
        .bind(message)
        .bind("192.168.1.1")
        .bind(endpoint)
        .bind(response_time_ms)
        .bind(error_code)
        .execute(&mut *tx)
        .await?;
    }
    println!("Created {} system logs", SYSTEM_LOGS.len());

    tx.commit().await?;
    pool.close().await;

    println!();
    println!("Database seeding completed successfully!");
    println!("Demo logins: admin / admin123, student@university.edu / admin123");
    Ok(())
}

use crate::domain::categories::{ORG_CATEGORIES, PROBLEM_CATEGORIES};
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand_core::OsRng;
use sqlx::PgPool;

pub async fn seed_all(pool: &PgPool) -> Result<()> {
    seed_departments(pool).await?;
    seed_admin(pool).await?;
    seed_problems(pool).await?;
    Ok(())
}

/// Codes 1 and 2 are reserved sentinels: employees land in 未所属 until an
/// admin assigns them, and 経営管理 is excluded from department rollups.
async fn seed_departments(pool: &PgPool) -> Result<()> {
    for (name, code) in [("未所属", "1"), ("経営管理", "2")] {
        sqlx::query(
            r#"
            INSERT INTO departments (name, code)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM departments WHERE code = $2)
            "#,
        )
        .bind(name)
        .bind(code)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_admin(pool: &PgPool) -> Result<()> {
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin1234".to_string());

    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM employees WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let salt = SaltString::generate(OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO employees (name, email, hash, role)
        VALUES ('システム管理者', $1, $2, 'admin')
        "#,
    )
    .bind(&email)
    .bind(&hash)
    .execute(pool)
    .await?;

    tracing::info!("Seeded admin account: {}", email);
    Ok(())
}

/// Starter problem bank: one question per scoring category so a fresh
/// install can run a survey immediately. Skipped once any problem exists.
async fn seed_problems(pool: &PgPool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM problems")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    let question_texts = [
        "あなたの部署では、新しいやり方を積極的に取り入れていますか？",
        "あなたのチームは、成果を意識して業務に取り組んでいますか？",
        "顧客の声が日々の業務の改善に反映されていますか？",
        "部署をまたいだ連携がスムーズに行われていますか？",
        "後輩や同僚の育成に時間が割かれていますか？",
        "会議で反対意見を安心して言えますか？",
        "無駄な業務を見直す取り組みが行われていますか？",
        "会社の理念を自分の言葉で説明できますか？",
    ];

    for (idx, category) in ORG_CATEGORIES.iter().enumerate() {
        let group = PROBLEM_CATEGORIES[idx % PROBLEM_CATEGORIES.len()];
        sqlx::query(
            r#"
            INSERT INTO problems (
                question_text, category, category_id,
                answer1_score, answer2_score, answer3_score,
                answer4_score, answer5_score, answer6_score,
                display_order
            ) VALUES ($1, $2, $3, 6, 5, 4, 3, 2, 1, $4)
            "#,
        )
        .bind(question_texts[idx])
        .bind(group)
        .bind(category.id)
        .bind(idx as i32)
        .execute(pool)
        .await?;
    }

    tracing::info!("Seeded {} starter problems", ORG_CATEGORIES.len());
    Ok(())
}

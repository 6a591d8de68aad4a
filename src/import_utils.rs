//! Bulk employee import. The client parses the uploaded workbook and
//! posts plain row arrays; rows are processed sequentially and a failed
//! row never aborts the rest (partial-success semantics).

use crate::db;
use crate::domain::models::Role;
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeImportRow {
    pub name: String,
    pub email: String,
    pub department_code: Option<String>,
    pub job_name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

pub async fn import_employees(pool: &PgPool, rows: &[EmployeeImportRow]) -> Result<ImportOutcome> {
    let mut imported = 0usize;
    let mut errors = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        // Rows are 1-based in the admin's spreadsheet view.
        let row_number = idx + 1;
        match import_row(pool, row).await {
            Ok(()) => imported += 1,
            Err(e) => {
                tracing::warn!("Employee import row {} failed: {}", row_number, e);
                errors.push(RowError {
                    row: row_number,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(ImportOutcome { imported, errors })
}

async fn import_row(pool: &PgPool, row: &EmployeeImportRow) -> Result<()> {
    let name = row.name.trim();
    if name.is_empty() {
        anyhow::bail!("氏名が空です");
    }
    let email = row.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        anyhow::bail!("メールアドレスが不正です: {}", row.email);
    }

    if db::find_employee_by_email(pool, &email).await?.is_some() {
        anyhow::bail!("{} は既に登録されています", email);
    }

    let department_id = match row.department_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            let id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM departments WHERE code = $1")
                    .bind(code)
                    .fetch_optional(pool)
                    .await?;
            match id {
                Some(id) => Some(id),
                None => anyhow::bail!("部署コード {} が見つかりません", code),
            }
        }
        _ => None,
    };

    let job_id = match row.job_name.as_deref().map(str::trim) {
        Some(job_name) if !job_name.is_empty() => match db::find_job_by_name(pool, job_name).await? {
            Some(job) => Some(job.id),
            None => anyhow::bail!("役職 {} が見つかりません", job_name),
        },
        _ => None,
    };

    let password = match row.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => generate_password(),
    };
    let salt = SaltString::generate(OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("パスワードの生成に失敗しました: {e}"))?
        .to_string();

    sqlx::query(
        r#"
        INSERT INTO employees (name, email, hash, role, department_id, job_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(name)
    .bind(&email)
    .bind(&hash)
    .bind(row.role.unwrap_or(Role::Employee))
    .bind(department_id)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

use crate::models::company::{Company, CompanyRequest};
use crate::utils::error::{AppError, AppResult};
use sqlx::MySqlPool;
use validator::Validate;

#[derive(Clone)]
pub struct CompanyService {
    pool: MySqlPool,
}

impl CompanyService {
    pub fn new(pool: MySqlPool) -> Self {
        CompanyService { pool }
    }

    pub async fn create_company(&self, request: CompanyRequest) -> AppResult<Company> {
        request.validate()?;
        self.ensure_unique_business_number(&request.business_number, None)
            .await?;

        let result = sqlx::query(
            "INSERT INTO company (name, business_number, contact_email, phone) VALUES (?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.business_number)
        .bind(&request.contact_email)
        .bind(&request.phone)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i32;
        tracing::info!(company_id = id, name = %request.name, "company created");
        self.get_company(id).await
    }

    pub async fn list_companies(&self) -> AppResult<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, business_number, contact_email, phone FROM company ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    pub async fn get_company(&self, id: i32) -> AppResult<Company> {
        sqlx::query_as::<_, Company>(
            "SELECT id, name, business_number, contact_email, phone FROM company WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".into()))
    }

    pub async fn update_company(&self, id: i32, request: CompanyRequest) -> AppResult<Company> {
        request.validate()?;
        self.get_company(id).await?;
        self.ensure_unique_business_number(&request.business_number, Some(id))
            .await?;

        sqlx::query(
            "UPDATE company SET name = ?, business_number = ?, contact_email = ?, phone = ? WHERE id = ?",
        )
        .bind(&request.name)
        .bind(&request.business_number)
        .bind(&request.contact_email)
        .bind(&request.phone)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_company(id).await
    }

    pub async fn delete_company(&self, id: i32) -> AppResult<()> {
        let (performances,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM performance WHERE company_id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if performances > 0 {
            return Err(AppError::Conflict(
                "Company still has performances".into(),
            ));
        }

        let result = sqlx::query("DELETE FROM company WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Company not found".into()));
        }
        tracing::info!(company_id = id, "company deleted");
        Ok(())
    }

    async fn ensure_unique_business_number(
        &self,
        business_number: &str,
        except_id: Option<i32>,
    ) -> AppResult<()> {
        let existing: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM company WHERE business_number = ?")
                .bind(business_number)
                .fetch_optional(&self.pool)
                .await?;

        match existing {
            Some((id,)) if Some(id) != except_id => Err(AppError::Conflict(
                "Business number already registered".into(),
            )),
            _ => Ok(()),
        }
    }
}

use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::{
    DonationChanges, DonationWithDonor, Fund, FundChanges, FundWithDonations, NewDonation, NewFund,
    Store, UserDonationRow,
};

const FUND_COLUMNS: &str = "id, title, goal, description, thumbnail, created_at, updated_at";

const DONATIONS_WITH_DONOR: &str = r#"
    SELECT d.id, d.fund_id, d.donate_amount, d.status, d.proof_attachment,
           d.created_at, u.full_name, u.email
      FROM donations d
      JOIN users u ON u.id = d.user_id
"#;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

async fn load_fund(
    conn: &mut PgConnection,
    fund_id: i32,
) -> anyhow::Result<Option<FundWithDonations>> {
    let fund = sqlx::query_as::<_, Fund>(&format!(
        "SELECT {} FROM funds WHERE id = $1",
        FUND_COLUMNS
    ))
    .bind(fund_id)
    .fetch_optional(&mut *conn)
    .await
    .context("select fund")?;

    let Some(fund) = fund else {
        return Ok(None);
    };

    let donations = sqlx::query_as::<_, DonationWithDonor>(&format!(
        "{} WHERE d.fund_id = $1 ORDER BY d.id",
        DONATIONS_WITH_DONOR
    ))
    .bind(fund_id)
    .fetch_all(&mut *conn)
    .await
    .context("select donations by fund")?;

    Ok(Some(FundWithDonations { fund, donations }))
}

#[async_trait]
impl Store for PgStore {
    async fn list_funds(&self) -> anyhow::Result<Vec<FundWithDonations>> {
        let funds = sqlx::query_as::<_, Fund>(&format!(
            "SELECT {} FROM funds ORDER BY id",
            FUND_COLUMNS
        ))
        .fetch_all(&self.db)
        .await
        .context("list funds")?;

        let ids: Vec<i32> = funds.iter().map(|f| f.id).collect();
        let donations = sqlx::query_as::<_, DonationWithDonor>(&format!(
            "{} WHERE d.fund_id = ANY($1) ORDER BY d.id",
            DONATIONS_WITH_DONOR
        ))
        .bind(&ids[..])
        .fetch_all(&self.db)
        .await
        .context("list donations")?;

        let mut by_fund: HashMap<i32, Vec<DonationWithDonor>> = HashMap::new();
        for d in donations {
            by_fund.entry(d.fund_id).or_default().push(d);
        }

        Ok(funds
            .into_iter()
            .map(|fund| FundWithDonations {
                donations: by_fund.remove(&fund.id).unwrap_or_default(),
                fund,
            })
            .collect())
    }

    async fn find_fund(&self, fund_id: i32) -> anyhow::Result<Option<FundWithDonations>> {
        let mut conn = self.db.acquire().await.context("acquire connection")?;
        load_fund(&mut conn, fund_id).await
    }

    async fn fund_exists(&self, fund_id: i32) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM funds WHERE id = $1)")
            .bind(fund_id)
            .fetch_one(&self.db)
            .await
            .context("fund exists")?;
        Ok(exists)
    }

    async fn user_exists(&self, user_id: i32) -> anyhow::Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .context("user exists")?;
        Ok(exists)
    }

    async fn list_funds_by_owner(&self, user_id: i32) -> anyhow::Result<Vec<Fund>> {
        let funds = sqlx::query_as::<_, Fund>(
            r#"
            SELECT f.id, f.title, f.goal, f.description, f.thumbnail, f.created_at, f.updated_at
              FROM funds f
              JOIN user_funds uf ON uf.fund_id = f.id
             WHERE uf.user_id = $1
             ORDER BY f.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list funds by owner")?;
        Ok(funds)
    }

    async fn is_fund_owner(&self, fund_id: i32, user_id: i32) -> anyhow::Result<bool> {
        let owns = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_funds WHERE fund_id = $1 AND user_id = $2)",
        )
        .bind(fund_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .context("fund ownership")?;
        Ok(owns)
    }

    async fn create_fund(&self, owner_id: i32, fund: NewFund) -> anyhow::Result<Fund> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let created = sqlx::query_as::<_, Fund>(&format!(
            r#"
            INSERT INTO funds (title, goal, description, thumbnail)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            FUND_COLUMNS
        ))
        .bind(&fund.title)
        .bind(fund.goal)
        .bind(&fund.description)
        .bind(&fund.thumbnail)
        .fetch_one(&mut *tx)
        .await
        .context("insert fund")?;

        sqlx::query("INSERT INTO user_funds (user_id, fund_id) VALUES ($1, $2)")
            .bind(owner_id)
            .bind(created.id)
            .execute(&mut *tx)
            .await
            .context("insert fund ownership")?;

        tx.commit().await.context("commit tx")?;
        Ok(created)
    }

    async fn update_fund(&self, fund_id: i32, changes: FundChanges) -> anyhow::Result<Option<Fund>> {
        let fund = sqlx::query_as::<_, Fund>(&format!(
            r#"
            UPDATE funds
               SET title       = COALESCE($2, title),
                   goal        = COALESCE($3, goal),
                   description = COALESCE($4, description),
                   thumbnail   = COALESCE($5, thumbnail),
                   updated_at  = now()
             WHERE id = $1
            RETURNING {}
            "#,
            FUND_COLUMNS
        ))
        .bind(fund_id)
        .bind(changes.title)
        .bind(changes.goal)
        .bind(changes.description)
        .bind(changes.thumbnail)
        .fetch_optional(&self.db)
        .await
        .context("update fund")?;
        Ok(fund)
    }

    async fn delete_fund(&self, fund_id: i32) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM funds WHERE id = $1")
            .bind(fund_id)
            .execute(&self.db)
            .await
            .context("delete fund")?;
        Ok(res.rows_affected())
    }

    async fn add_donation(&self, donation: NewDonation) -> anyhow::Result<Option<FundWithDonations>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Holds the fund row until commit so a concurrent delete can't slip in.
        let fund = sqlx::query_scalar::<_, i32>("SELECT id FROM funds WHERE id = $1 FOR SHARE")
            .bind(donation.fund_id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock fund")?;
        if fund.is_none() {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO donations (fund_id, user_id, donate_amount, proof_attachment)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(donation.fund_id)
        .bind(donation.user_id)
        .bind(donation.donate_amount)
        .bind(&donation.proof_attachment)
        .execute(&mut *tx)
        .await
        .context("insert donation")?;

        let refreshed = load_fund(&mut tx, donation.fund_id).await?;
        tx.commit().await.context("commit tx")?;
        Ok(refreshed)
    }

    async fn find_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
    ) -> anyhow::Result<Option<DonationWithDonor>> {
        let row = sqlx::query_as::<_, DonationWithDonor>(&format!(
            "{} WHERE d.id = $1 AND d.fund_id = $2",
            DONATIONS_WITH_DONOR
        ))
        .bind(donation_id)
        .bind(fund_id)
        .fetch_optional(&self.db)
        .await
        .context("find donation")?;
        Ok(row)
    }

    async fn update_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
        changes: DonationChanges,
    ) -> anyhow::Result<Option<FundWithDonations>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let res = sqlx::query(
            r#"
            UPDATE donations
               SET status        = COALESCE($3, status),
                   donate_amount = COALESCE($4, donate_amount),
                   updated_at    = now()
             WHERE id = $1 AND fund_id = $2
               AND ($5::donation_status IS NULL OR status = $5)
            "#,
        )
        .bind(donation_id)
        .bind(fund_id)
        .bind(changes.status)
        .bind(changes.donate_amount)
        .bind(changes.expected_status)
        .execute(&mut *tx)
        .await
        .context("update donation")?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }

        let refreshed = load_fund(&mut tx, fund_id).await?;
        tx.commit().await.context("commit tx")?;
        Ok(refreshed)
    }

    async fn list_donations_by_user(&self, user_id: i32) -> anyhow::Result<Vec<UserDonationRow>> {
        let rows = sqlx::query_as::<_, UserDonationRow>(
            r#"
            SELECT d.id, f.title, d.donate_amount, d.status, d.created_at
              FROM donations d
              JOIN funds f ON f.id = d.fund_id
             WHERE d.user_id = $1
             ORDER BY d.created_at DESC, d.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list donations by user")?;
        Ok(rows)
    }
}

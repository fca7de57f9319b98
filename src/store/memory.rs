use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    DonationChanges, DonationWithDonor, Fund, FundChanges, FundWithDonations, NewDonation, NewFund,
    Store, UserDonationRow,
};
use crate::donations::status::DonationStatus;

#[derive(Debug, Clone)]
struct UserRow {
    id: i32,
    full_name: String,
    email: String,
}

#[derive(Debug, Clone)]
struct DonationRow {
    id: i32,
    fund_id: i32,
    user_id: i32,
    donate_amount: i32,
    status: DonationStatus,
    proof_attachment: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Tables {
    next_id: i32,
    users: Vec<UserRow>,
    funds: Vec<Fund>,
    ownerships: Vec<(i32, i32)>, // (user_id, fund_id)
    donations: Vec<DonationRow>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn with_donor(&self, d: &DonationRow) -> Option<DonationWithDonor> {
        let user = self.users.iter().find(|u| u.id == d.user_id)?;
        Some(DonationWithDonor {
            id: d.id,
            fund_id: d.fund_id,
            donate_amount: d.donate_amount,
            status: d.status,
            proof_attachment: d.proof_attachment.clone(),
            created_at: d.created_at,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        })
    }

    fn aggregate(&self, fund: &Fund) -> FundWithDonations {
        FundWithDonations {
            fund: fund.clone(),
            donations: self
                .donations
                .iter()
                .filter(|d| d.fund_id == fund.id)
                .filter_map(|d| self.with_donor(d))
                .collect(),
        }
    }

    fn load_fund(&self, fund_id: i32) -> Option<FundWithDonations> {
        self.funds
            .iter()
            .find(|f| f.id == fund_id)
            .map(|f| self.aggregate(f))
    }
}

/// Test double for the Postgres store, including its cascade rules.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn insert_user(&self, full_name: &str, email: &str) -> i32 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        t.users.push(UserRow {
            id,
            full_name: full_name.into(),
            email: email.into(),
        });
        id
    }

    pub fn delete_user(&self, user_id: i32) {
        let mut t = self.tables.lock().unwrap();
        t.users.retain(|u| u.id != user_id);
        t.ownerships.retain(|(u, _)| *u != user_id);
        t.donations.retain(|d| d.user_id != user_id);
    }

    pub fn donation_count(&self) -> usize {
        self.tables.lock().unwrap().donations.len()
    }

    pub fn fund_count(&self) -> usize {
        self.tables.lock().unwrap().funds.len()
    }

    pub fn ownership_count(&self) -> usize {
        self.tables.lock().unwrap().ownerships.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_funds(&self) -> anyhow::Result<Vec<FundWithDonations>> {
        let t = self.tables.lock().unwrap();
        Ok(t.funds.iter().map(|f| t.aggregate(f)).collect())
    }

    async fn find_fund(&self, fund_id: i32) -> anyhow::Result<Option<FundWithDonations>> {
        Ok(self.tables.lock().unwrap().load_fund(fund_id))
    }

    async fn fund_exists(&self, fund_id: i32) -> anyhow::Result<bool> {
        Ok(self.tables.lock().unwrap().funds.iter().any(|f| f.id == fund_id))
    }

    async fn user_exists(&self, user_id: i32) -> anyhow::Result<bool> {
        Ok(self.tables.lock().unwrap().users.iter().any(|u| u.id == user_id))
    }

    async fn list_funds_by_owner(&self, user_id: i32) -> anyhow::Result<Vec<Fund>> {
        let t = self.tables.lock().unwrap();
        Ok(t.funds
            .iter()
            .filter(|f| t.ownerships.contains(&(user_id, f.id)))
            .cloned()
            .collect())
    }

    async fn is_fund_owner(&self, fund_id: i32, user_id: i32) -> anyhow::Result<bool> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .ownerships
            .contains(&(user_id, fund_id)))
    }

    async fn create_fund(&self, owner_id: i32, fund: NewFund) -> anyhow::Result<Fund> {
        let mut t = self.tables.lock().unwrap();
        anyhow::ensure!(
            t.users.iter().any(|u| u.id == owner_id),
            "foreign key violation: user {} does not exist",
            owner_id
        );
        let now = OffsetDateTime::now_utc();
        let created = Fund {
            id: t.next_id(),
            title: fund.title,
            goal: fund.goal,
            description: fund.description,
            thumbnail: fund.thumbnail,
            created_at: now,
            updated_at: now,
        };
        t.funds.push(created.clone());
        t.ownerships.push((owner_id, created.id));
        Ok(created)
    }

    async fn update_fund(&self, fund_id: i32, changes: FundChanges) -> anyhow::Result<Option<Fund>> {
        let mut t = self.tables.lock().unwrap();
        let Some(fund) = t.funds.iter_mut().find(|f| f.id == fund_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            fund.title = title;
        }
        if let Some(goal) = changes.goal {
            fund.goal = goal;
        }
        if let Some(description) = changes.description {
            fund.description = description;
        }
        if let Some(thumbnail) = changes.thumbnail {
            fund.thumbnail = thumbnail;
        }
        fund.updated_at = OffsetDateTime::now_utc();
        Ok(Some(fund.clone()))
    }

    async fn delete_fund(&self, fund_id: i32) -> anyhow::Result<u64> {
        let mut t = self.tables.lock().unwrap();
        let before = t.funds.len();
        t.funds.retain(|f| f.id != fund_id);
        let removed = (before - t.funds.len()) as u64;
        t.ownerships.retain(|(_, f)| *f != fund_id);
        t.donations.retain(|d| d.fund_id != fund_id);
        Ok(removed)
    }

    async fn add_donation(&self, donation: NewDonation) -> anyhow::Result<Option<FundWithDonations>> {
        let mut t = self.tables.lock().unwrap();
        if !t.funds.iter().any(|f| f.id == donation.fund_id) {
            return Ok(None);
        }
        anyhow::ensure!(
            t.users.iter().any(|u| u.id == donation.user_id),
            "foreign key violation: user {} does not exist",
            donation.user_id
        );
        let id = t.next_id();
        t.donations.push(DonationRow {
            id,
            fund_id: donation.fund_id,
            user_id: donation.user_id,
            donate_amount: donation.donate_amount,
            status: DonationStatus::default(),
            proof_attachment: donation.proof_attachment,
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(t.load_fund(donation.fund_id))
    }

    async fn find_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
    ) -> anyhow::Result<Option<DonationWithDonor>> {
        let t = self.tables.lock().unwrap();
        Ok(t.donations
            .iter()
            .find(|d| d.id == donation_id && d.fund_id == fund_id)
            .and_then(|d| t.with_donor(d)))
    }

    async fn update_donation(
        &self,
        fund_id: i32,
        donation_id: i32,
        changes: DonationChanges,
    ) -> anyhow::Result<Option<FundWithDonations>> {
        let mut t = self.tables.lock().unwrap();
        let Some(row) = t
            .donations
            .iter_mut()
            .find(|d| d.id == donation_id && d.fund_id == fund_id)
        else {
            return Ok(None);
        };
        if changes.expected_status.is_some_and(|s| s != row.status) {
            return Ok(None);
        }
        if let Some(status) = changes.status {
            row.status = status;
        }
        if let Some(amount) = changes.donate_amount {
            row.donate_amount = amount;
        }
        Ok(t.load_fund(fund_id))
    }

    async fn list_donations_by_user(&self, user_id: i32) -> anyhow::Result<Vec<UserDonationRow>> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<UserDonationRow> = t
            .donations
            .iter()
            .filter(|d| d.user_id == user_id)
            .filter_map(|d| {
                let fund = t.funds.iter().find(|f| f.id == d.fund_id)?;
                Some(UserDonationRow {
                    id: d.id,
                    title: fund.title.clone(),
                    donate_amount: d.donate_amount,
                    status: d.status,
                    created_at: d.created_at,
                })
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_fund(title: &str) -> NewFund {
        NewFund {
            title: title.into(),
            goal: 100,
            description: "clean water".into(),
            thumbnail: "fundraiser/well".into(),
        }
    }

    #[tokio::test]
    async fn deleting_a_fund_cascades() {
        let store = MemoryStore::default();
        let owner = store.insert_user("Owner", "owner@mail.com");
        let donor = store.insert_user("Donor", "donor@mail.com");
        let fund = store.create_fund(owner, new_fund("Well")).await.unwrap();
        store
            .add_donation(NewDonation {
                fund_id: fund.id,
                user_id: donor,
                donate_amount: 10,
                proof_attachment: "fundraiser/proof".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.delete_fund(fund.id).await.unwrap(), 1);
        assert_eq!(store.donation_count(), 0);
        assert_eq!(store.ownership_count(), 0);
        assert_eq!(store.delete_fund(fund.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::default();
        let owner = store.insert_user("Owner", "owner@mail.com");
        let fund = store.create_fund(owner, new_fund("Well")).await.unwrap();
        store
            .add_donation(NewDonation {
                fund_id: fund.id,
                user_id: owner,
                donate_amount: 10,
                proof_attachment: "fundraiser/proof".into(),
            })
            .await
            .unwrap();

        store.delete_user(owner);
        assert_eq!(store.donation_count(), 0);
        assert_eq!(store.ownership_count(), 0);
        assert_eq!(store.fund_count(), 1);
    }

    #[tokio::test]
    async fn stale_status_update_is_not_applied() {
        let store = MemoryStore::default();
        let owner = store.insert_user("Owner", "owner@mail.com");
        let fund = store.create_fund(owner, new_fund("Well")).await.unwrap();
        let added = store
            .add_donation(NewDonation {
                fund_id: fund.id,
                user_id: owner,
                donate_amount: 10,
                proof_attachment: "fundraiser/proof".into(),
            })
            .await
            .unwrap()
            .unwrap();
        let donation_id = added.donations[0].id;

        let review = |status| DonationChanges {
            status: Some(status),
            expected_status: Some(DonationStatus::Pending),
            ..Default::default()
        };
        assert!(store
            .update_donation(fund.id, donation_id, review(DonationStatus::Accepted))
            .await
            .unwrap()
            .is_some());
        // a second review that read the donation while it was still pending
        assert!(store
            .update_donation(fund.id, donation_id, review(DonationStatus::Rejected))
            .await
            .unwrap()
            .is_none());

        let current = store.find_donation(fund.id, donation_id).await.unwrap().unwrap();
        assert_eq!(current.status, DonationStatus::Accepted);
    }

    #[tokio::test]
    async fn create_fund_requires_existing_owner() {
        let store = MemoryStore::default();
        assert!(store.create_fund(42, new_fund("Well")).await.is_err());
        assert_eq!(store.fund_count(), 0);
    }
}

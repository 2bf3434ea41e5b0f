//! Reviews and ratings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Rating;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub text: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn create(user_id: Uuid, product_id: Uuid, text: Option<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), user_id, product_id, text, created_at: now, updated_at: now }
    }

    /// Newest first.
    pub fn sort_newest_first(reviews: &mut [Review]) {
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub value: Rating,
}

impl Rate {
    pub fn create(user_id: Uuid, product_id: Uuid, value: Rating) -> Self {
        Self { id: Uuid::now_v7(), user_id, product_id, value }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    pub count: usize,
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_rates(rates: &[Rate]) -> Self {
        if rates.is_empty() { return Self::default(); }
        let total: u32 = rates.iter().map(|r| u32::from(r.value.value())).sum();
        Self { count: rates.len(), average: Some(f64::from(total) / rates.len() as f64) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary() {
        let p = Uuid::now_v7();
        assert_eq!(RatingSummary::from_rates(&[]), RatingSummary { count: 0, average: None });
        let rates = vec![
            Rate::create(Uuid::now_v7(), p, Rating::new(5).unwrap()),
            Rate::create(Uuid::now_v7(), p, Rating::new(2).unwrap()),
        ];
        assert_eq!(RatingSummary::from_rates(&rates), RatingSummary { count: 2, average: Some(3.5) });
    }

    #[test]
    fn test_reviews_newest_first() {
        let p = Uuid::now_v7();
        let mut old = Review::create(Uuid::now_v7(), p, Some("ok".into()));
        old.created_at -= chrono::Duration::days(1);
        let new = Review::create(Uuid::now_v7(), p, Some("great".into()));
        let mut reviews = vec![old.clone(), new.clone()];
        Review::sort_newest_first(&mut reviews);
        assert_eq!(reviews[0].id, new.id);
        assert_eq!(reviews[1].id, old.id);
    }
}

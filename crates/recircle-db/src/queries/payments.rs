use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{info, warn};

use recircle_types::models::{PaymentKind, PaymentProvider, membership_tier, payment_status};

use crate::Database;
use crate::models::PaymentRow;
use crate::new_id;
use crate::queries::events::{query_event, set_enrollment_paid, upsert_enrollment};
use crate::queries::trade::mark_item_sold;

const PAYMENT_COLUMNS: &str = "id, user_id, kind, reference_id, amount, currency, provider, \
     provider_ref, status, title, created_at";

pub struct NewPayment<'a> {
    pub user_id: &'a str,
    pub kind: PaymentKind,
    pub reference_id: Option<&'a str>,
    /// Major currency units, as the user sees them.
    pub amount: i64,
    pub currency: &'a str,
    pub provider: PaymentProvider,
    pub provider_ref: Option<&'a str>,
    pub title: Option<&'a str>,
}

/// Result of a completion attempt. `fulfilled` is false when the payment
/// was already paid and nothing was changed.
#[derive(Debug)]
pub struct PaymentUpdate {
    pub payment: PaymentRow,
    pub fulfilled: bool,
}

fn map_payment(row: &Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        reference_id: row.get(3)?,
        amount: row.get(4)?,
        currency: row.get(5)?,
        provider: row.get(6)?,
        provider_ref: row.get(7)?,
        status: row.get(8)?,
        title: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn query_payment(conn: &Connection, id: &str) -> Result<Option<PaymentRow>> {
    let sql = format!("SELECT {} FROM payments WHERE id = ?1", PAYMENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], map_payment).optional()?)
}

/// Apply what the payment bought. Runs inside the caller's transaction.
fn fulfil(conn: &Connection, payment: &PaymentRow) -> Result<()> {
    let Some(kind) = PaymentKind::parse(&payment.kind) else {
        warn!("Payment {} has unknown kind {:?}, nothing to fulfil", payment.id, payment.kind);
        return Ok(());
    };

    match kind {
        PaymentKind::Membership => {
            conn.execute(
                "INSERT INTO memberships (user_id, tier, active, renews_at)
                 VALUES (?1, ?2, 1, strftime('%Y-%m-%d %H:%M:%f', 'now', '+30 days'))
                 ON CONFLICT(user_id) DO UPDATE SET
                    tier = excluded.tier,
                    active = 1,
                    renews_at = excluded.renews_at",
                (&payment.user_id, membership_tier::PREMIUM),
            )?;
            info!("Membership upgraded to premium for {}", payment.user_id);
        }
        PaymentKind::Event => {
            let Some(event_id) = payment.reference_id.as_deref() else {
                warn!("Event payment {} carries no event id", payment.id);
                return Ok(());
            };
            if query_event(conn, event_id)?.is_none() {
                warn!("Event payment {} references unknown event {}", payment.id, event_id);
                return Ok(());
            }
            upsert_enrollment(conn, event_id, &payment.user_id)?;
            set_enrollment_paid(conn, event_id, &payment.user_id)?;
            info!("Enrollment in event {} paid by {}", event_id, payment.user_id);
        }
        PaymentKind::Item => {
            let Some(item_id) = payment.reference_id.as_deref() else {
                warn!("Item payment {} carries no item id", payment.id);
                return Ok(());
            };
            mark_item_sold(conn, item_id)?;
            info!("Item {} sold via payment {}", item_id, payment.id);
        }
    }
    Ok(())
}

impl Database {
    pub fn create_payment(&self, new: &NewPayment<'_>) -> Result<PaymentRow> {
        self.with_conn(|conn| {
            let id = new_id();
            conn.execute(
                "INSERT INTO payments
                    (id, user_id, kind, reference_id, amount, currency, provider, provider_ref, status, title)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    new.user_id,
                    new.kind.as_str(),
                    new.reference_id,
                    new.amount,
                    new.currency,
                    new.provider.as_str(),
                    new.provider_ref,
                    payment_status::PENDING,
                    new.title,
                ],
            )?;
            query_payment(conn, &id)?.ok_or_else(|| anyhow::anyhow!("payment {} vanished after insert", id))
        })
    }

    pub fn set_provider_ref(&self, payment_id: &str, provider_ref: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE payments SET provider_ref = ?1 WHERE id = ?2",
                [provider_ref, payment_id],
            )?;
            Ok(())
        })
    }

    pub fn get_payment(&self, id: &str) -> Result<Option<PaymentRow>> {
        self.with_conn(|conn| query_payment(conn, id))
    }

    pub fn find_payment_by_provider_ref(
        &self,
        provider: PaymentProvider,
        provider_ref: &str,
    ) -> Result<Option<PaymentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM payments WHERE provider = ?1 AND provider_ref = ?2",
                PAYMENT_COLUMNS
            );
            Ok(conn
                .query_row(&sql, [provider.as_str(), provider_ref], map_payment)
                .optional()?)
        })
    }

    /// Mark a payment paid and fulfil it in the same transaction. A payment
    /// that is already paid comes back untouched with `fulfilled: false`.
    /// Returns `None` for unknown ids.
    pub fn complete_payment(&self, payment_id: &str) -> Result<Option<PaymentUpdate>> {
        self.with_tx(|tx| {
            let Some(payment) = query_payment(tx, payment_id)? else {
                return Ok(None);
            };
            if payment.status == payment_status::PAID {
                info!("Payment {} already paid, skipping fulfilment", payment.id);
                return Ok(Some(PaymentUpdate {
                    payment,
                    fulfilled: false,
                }));
            }

            tx.execute(
                "UPDATE payments SET status = ?1 WHERE id = ?2",
                [payment_status::PAID, payment_id],
            )?;
            fulfil(tx, &payment)?;

            let payment = query_payment(tx, payment_id)?
                .ok_or_else(|| anyhow::anyhow!("payment {} vanished during completion", payment_id))?;
            Ok(Some(PaymentUpdate {
                payment,
                fulfilled: true,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn pending<'a>(user_id: &'a str, kind: PaymentKind, reference_id: Option<&'a str>) -> NewPayment<'a> {
        NewPayment {
            user_id,
            kind,
            reference_id,
            amount: 199,
            currency: "INR",
            provider: PaymentProvider::Stripe,
            provider_ref: None,
            title: Some("test"),
        }
    }

    #[test]
    fn membership_payment_upgrades_once() {
        let db = test_support::db();
        let uid = test_support::user(&db, "p@x.io");

        let payment = db.create_payment(&pending(&uid, PaymentKind::Membership, None)).unwrap();
        assert_eq!(payment.status, "pending");
        db.set_provider_ref(&payment.id, "cs_test_1").unwrap();

        let found = db
            .find_payment_by_provider_ref(PaymentProvider::Stripe, "cs_test_1")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, payment.id);
        assert!(db
            .find_payment_by_provider_ref(PaymentProvider::Razorpay, "cs_test_1")
            .unwrap()
            .is_none());

        let first = db.complete_payment(&payment.id).unwrap().unwrap();
        assert!(first.fulfilled);
        assert_eq!(first.payment.status, "paid");

        let membership = db.get_membership(&uid).unwrap().unwrap();
        assert_eq!(membership.tier, "premium");
        assert!(membership.active);
        let renews = crate::parse_timestamp(membership.renews_at.as_deref().unwrap()).unwrap();
        assert!(renews > chrono::Utc::now() + chrono::Duration::days(29));

        let second = db.complete_payment(&payment.id).unwrap().unwrap();
        assert!(!second.fulfilled);
    }

    #[test]
    fn event_payment_marks_enrollment_paid() {
        let db = test_support::db();
        let uid = test_support::user(&db, "ev@x.io");
        let payment = db.create_payment(&pending(&uid, PaymentKind::Event, Some("2"))).unwrap();

        db.complete_payment(&payment.id).unwrap().unwrap();
        let enrollment = db.enroll_in_event("2", &uid).unwrap();
        assert!(enrollment.paid);
    }

    #[test]
    fn item_payment_marks_item_sold() {
        let db = test_support::db();
        let seller = test_support::user(&db, "s@x.io");
        let buyer = test_support::user(&db, "b@x.io");
        let item = db.create_trade_item(&seller, "Rack", "Shoe rack", 15).unwrap();
        db.toggle_wishlist(&buyer, &item.id).unwrap();

        let payment = db.create_payment(&pending(&buyer, PaymentKind::Item, Some(&item.id))).unwrap();
        db.complete_payment(&payment.id).unwrap().unwrap();

        assert_eq!(db.get_trade_item(&item.id).unwrap().unwrap().status, "sold");
        assert!(db.get_wishlist(&buyer).unwrap().is_empty());
    }

    #[test]
    fn unknown_payment_is_none() {
        let db = test_support::db();
        assert!(db.complete_payment("missing").unwrap().is_none());
    }
}

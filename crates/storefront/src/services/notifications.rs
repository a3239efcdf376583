//! Order emails: the customer's confirmation and the shop's new-order alert.
//!
//! Checkout dispatches both in the background and never waits for them; a
//! mail failure is logged and the order stays as placed.

use std::sync::Arc;

use askama::Template;
use thiserror::Error;

use shopfront_core::Email;
use shopfront_core::models::Order;

use super::mailer::{MailError, MailTransport, OutgoingEmail};

/// Errors that can occur when building or sending an order email.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("template error: {0}")]
    Render(#[from] askama::Error),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// `ADMIN_NOTIFY_EMAIL` is not set.
    #[error("no admin notification address configured")]
    NoAdminRecipient,

    /// The order's customer email is not deliverable.
    #[error("invalid customer email: {0}")]
    InvalidRecipient(String),
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationEmail<'a> {
    order: &'a Order,
    order_url: String,
}

#[derive(Template)]
#[template(path = "email/admin_notification.html")]
struct AdminNotificationEmail<'a> {
    order: &'a Order,
}

/// Sends order emails through a [`MailTransport`].
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn MailTransport>,
    from: String,
    admin_email: Option<Email>,
    base_url: String,
}

impl Notifier {
    #[must_use]
    pub fn new(
        mailer: Arc<dyn MailTransport>,
        from: String,
        admin_email: Option<Email>,
        base_url: String,
    ) -> Self {
        Self {
            mailer,
            from,
            admin_email,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Email the customer a summary of their order.
    ///
    /// # Errors
    ///
    /// Returns an error if the customer email is invalid, rendering fails or
    /// the mail API rejects the message.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn send_order_confirmation(&self, order: &Order) -> Result<(), NotifyError> {
        let to = Email::parse(&order.customer.email)
            .map_err(|_| NotifyError::InvalidRecipient(order.customer.email.clone()))?;
        let html = OrderConfirmationEmail {
            order,
            order_url: format!("{}/account/orders/{}", self.base_url, order.id),
        }
        .render()?;

        self.mailer
            .send(&OutgoingEmail {
                from: self.from.clone(),
                to: vec![to.to_string()],
                subject: format!("Order {} confirmed", order.reference()),
                html,
            })
            .await?;
        Ok(())
    }

    /// Tell the shop a new order came in.
    ///
    /// # Errors
    ///
    /// Returns `NoAdminRecipient` when no address is configured, otherwise
    /// render or mail errors.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn send_admin_notification(&self, order: &Order) -> Result<(), NotifyError> {
        let to = self
            .admin_email
            .as_ref()
            .ok_or(NotifyError::NoAdminRecipient)?;
        let html = AdminNotificationEmail { order }.render()?;

        self.mailer
            .send(&OutgoingEmail {
                from: self.from.clone(),
                to: vec![to.to_string()],
                subject: format!(
                    "New order {} from {} ({})",
                    order.reference(),
                    order.customer.name,
                    order.total
                ),
                html,
            })
            .await?;
        Ok(())
    }

    /// Send both emails in the background.
    pub fn dispatch(&self, order: Order) -> tokio::task::JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_order_confirmation(&order).await {
                tracing::warn!(order_id = %order.id, error = %e, "Order confirmation not sent");
            }
            match notifier.send_admin_notification(&order).await {
                Ok(()) => {}
                Err(NotifyError::NoAdminRecipient) => {
                    tracing::debug!(order_id = %order.id, "Admin notifications disabled");
                }
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Admin notification not sent");
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use shopfront_core::models::{Cart, CustomerContact, PostalAddress, Product};
    use shopfront_core::{Money, OrderId, PaymentMethod, Percent, ProductId, UserId};

    use super::*;
    use crate::services::mailer::RecordingMailer;

    fn order() -> Order {
        let product = Product {
            id: ProductId::new("mug"),
            name: "Blue Mug".to_owned(),
            category: "kitchen".to_owned(),
            description: String::new(),
            price: Money::new(1000),
            discount: Percent::ZERO,
            stock: 5,
            image: None,
            featured: false,
            is_new: false,
        };
        let mut cart = Cart::new();
        cart.add(&product, Percent::ZERO, 2).unwrap();
        let mut order = Order::from_cart(
            UserId::new("u1"),
            CustomerContact {
                name: "Ann".to_owned(),
                email: "ann@example.com".to_owned(),
                phone: String::new(),
            },
            PostalAddress {
                full_name: "Ann".to_owned(),
                line1: "1 High St".to_owned(),
                city: "Town".to_owned(),
                ..PostalAddress::default()
            },
            PaymentMethod::CashOnDelivery,
            &cart,
            Utc::now(),
        );
        order.id = OrderId::new("order0001abcdef");
        order
    }

    fn notifier(mailer: &RecordingMailer, admin: Option<&str>) -> Notifier {
        Notifier::new(
            Arc::new(mailer.clone()),
            "Shop <orders@shop.test>".to_owned(),
            admin.map(|a| Email::parse(a).unwrap()),
            "https://shop.test/".to_owned(),
        )
    }

    #[tokio::test]
    async fn test_confirmation_goes_to_customer() {
        let mailer = RecordingMailer::new();
        notifier(&mailer, None)
            .send_order_confirmation(&order())
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["ann@example.com".to_owned()]);
        assert!(sent[0].html.contains("Blue Mug"));
        assert!(sent[0].html.contains("https://shop.test/account/orders/order0001abcdef"));
    }

    #[tokio::test]
    async fn test_admin_notification_needs_address() {
        let mailer = RecordingMailer::new();
        assert!(matches!(
            notifier(&mailer, None).send_admin_notification(&order()).await,
            Err(NotifyError::NoAdminRecipient)
        ));

        notifier(&mailer, Some("owner@shop.test"))
            .send_admin_notification(&order())
            .await
            .unwrap();
        assert_eq!(mailer.sent()[0].to, vec!["owner@shop.test".to_owned()]);
    }

    #[tokio::test]
    async fn test_dispatch_survives_mail_failure() {
        let mailer = RecordingMailer::failing();
        notifier(&mailer, Some("owner@shop.test"))
            .dispatch(order())
            .await
            .unwrap();
        assert!(mailer.sent().is_empty());
    }
}

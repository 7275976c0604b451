//! Order and stock notifications.
//!
//! Every [`Notifier`] method returns immediately. Delivery happens on a
//! spawned task and failures are logged, never returned: a notification can
//! not fail or delay the operation that triggered it.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use orchard_core::money::format_usd;
use orchard_core::{OrderStatus, PaymentMethod};

use crate::config::EmailConfig;

/// One line of an order as shown in a confirmation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSummary {
    pub name: String,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Fire-and-forget notification sink.
pub trait Notifier: Send + Sync {
    fn notify_admin_new_order(&self, order_number: &str, total: Decimal, customer_name: &str);

    fn notify_customer_order_placed(
        &self,
        email: &str,
        order_number: &str,
        total: Decimal,
        method: PaymentMethod,
        items: &[ItemSummary],
    );

    fn notify_admin_low_stock(&self, product_name: &str, new_stock: i32);

    fn notify_admin_out_of_stock(&self, product_name: &str);

    fn notify_customer_status_changed(&self, email: &str, order_number: &str, status: OrderStatus);
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

// =============================================================================
// Templates
// =============================================================================

fn admin_new_order(order_number: &str, total: Decimal, customer_name: &str) -> Email {
    Email {
        subject: format!("New order {order_number}"),
        body: format!(
            "{customer_name} placed order {order_number} for {}.\n\
             Payment is awaiting confirmation.",
            format_usd(total)
        ),
    }
}

fn customer_order_placed(
    order_number: &str,
    total: Decimal,
    method: PaymentMethod,
    items: &[ItemSummary],
) -> Email {
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "  {} x{}  {}",
                item.name,
                item.quantity,
                format_usd(item.line_total)
            )
        })
        .collect();

    Email {
        subject: format!("Your order {order_number}"),
        body: format!(
            "Thanks for your order!\n\n{}\n\nTotal: {}\n\n\
             Please send your payment via {} and include {order_number} in the note.\n\
             We will confirm your order as soon as the payment arrives.",
            lines.join("\n"),
            format_usd(total),
            method.display_name()
        ),
    }
}

fn admin_low_stock(product_name: &str, new_stock: i32) -> Email {
    Email {
        subject: format!("Low stock: {product_name}"),
        body: format!("{product_name} is down to {new_stock} in stock."),
    }
}

fn admin_out_of_stock(product_name: &str) -> Email {
    Email {
        subject: format!("Out of stock: {product_name}"),
        body: format!("{product_name} has sold out."),
    }
}

fn customer_status_changed(order_number: &str, status: OrderStatus) -> Email {
    Email {
        subject: format!("Order {order_number}: {}", status.display_name()),
        body: format!(
            "Your order {order_number} is now: {}.",
            status.display_name()
        ),
    }
}

// =============================================================================
// SMTP
// =============================================================================

/// Sends notifications over SMTP.
#[derive(Clone)]
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    admin_address: Option<String>,
}

impl EmailNotifier {
    /// Create a notifier from configuration.
    ///
    /// Admin alerts are dropped (with a log line) when `admin_address` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, admin_address: Option<String>) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            admin_address,
        })
    }

    fn build(&self, to: &str, email: Email) -> Result<Message, EmailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;
        Ok(message)
    }

    /// Queue `email` for delivery to `to` on the current runtime.
    fn dispatch(&self, to: &str, email: Email) {
        let subject = email.subject.clone();
        let message = match self.build(to, email) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, subject = %subject, "Dropping notification");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(subject = %subject, "No runtime to send notification on");
            return;
        };

        let mailer = self.mailer.clone();
        let to = to.to_owned();
        runtime.spawn(async move {
            match mailer.send(message).await {
                Ok(_) => tracing::info!(to = %to, subject = %subject, "Email sent"),
                Err(e) => {
                    tracing::warn!(error = %e, to = %to, subject = %subject, "Email send failed");
                }
            }
        });
    }

    fn dispatch_admin(&self, email: Email) {
        match &self.admin_address {
            Some(admin) => self.dispatch(admin, email),
            None => tracing::info!(subject = %email.subject, "No admin address, alert not sent"),
        }
    }
}

impl Notifier for EmailNotifier {
    fn notify_admin_new_order(&self, order_number: &str, total: Decimal, customer_name: &str) {
        self.dispatch_admin(admin_new_order(order_number, total, customer_name));
    }

    fn notify_customer_order_placed(
        &self,
        email: &str,
        order_number: &str,
        total: Decimal,
        method: PaymentMethod,
        items: &[ItemSummary],
    ) {
        self.dispatch(
            email,
            customer_order_placed(order_number, total, method, items),
        );
    }

    fn notify_admin_low_stock(&self, product_name: &str, new_stock: i32) {
        self.dispatch_admin(admin_low_stock(product_name, new_stock));
    }

    fn notify_admin_out_of_stock(&self, product_name: &str) {
        self.dispatch_admin(admin_out_of_stock(product_name));
    }

    fn notify_customer_status_changed(&self, email: &str, order_number: &str, status: OrderStatus) {
        self.dispatch(email, customer_status_changed(order_number, status));
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_admin_new_order(&self, order_number: &str, total: Decimal, customer_name: &str) {
        tracing::info!(%order_number, %total, %customer_name, "notify: new order");
    }

    fn notify_customer_order_placed(
        &self,
        email: &str,
        order_number: &str,
        total: Decimal,
        method: PaymentMethod,
        items: &[ItemSummary],
    ) {
        tracing::info!(
            %email,
            %order_number,
            %total,
            %method,
            item_count = items.len(),
            "notify: order placed"
        );
    }

    fn notify_admin_low_stock(&self, product_name: &str, new_stock: i32) {
        tracing::info!(%product_name, new_stock, "notify: low stock");
    }

    fn notify_admin_out_of_stock(&self, product_name: &str) {
        tracing::info!(%product_name, "notify: out of stock");
    }

    fn notify_customer_status_changed(&self, email: &str, order_number: &str, status: OrderStatus) {
        tracing::info!(%email, %order_number, %status, "notify: status changed");
    }
}

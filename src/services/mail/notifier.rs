use std::sync::Arc;

use tracing::{info, warn};

use super::{Email, Mailer};
use crate::storage::{Order, OrderStatus, User};
use crate::utils::csv_handler::format_price;

/// 组装通知邮件并投递
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
    currency: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, frontend_url: &str, currency: &str) -> Self {
        Self {
            mailer,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            currency: currency.to_string(),
        }
    }

    fn money(&self, cents: i64) -> String {
        format!("{} {}", format_price(cents), self.currency)
    }

    /// 投递失败只记日志
    async fn deliver(&self, email: Email) {
        let to = email.to.clone();
        let subject = email.subject.clone();
        match self.mailer.send(email).await {
            Ok(()) => info!("Email '{}' sent to {} via {}", subject, to, self.mailer.name()),
            Err(e) => warn!(
                "Failed to send email '{}' to {} via {}: {}",
                subject,
                to,
                self.mailer.name(),
                e
            ),
        }
    }

    pub async fn welcome(&self, user: &User) {
        let body = format!(
            "Hi {},\n\n\
             Welcome to BookHaven! Your account is ready.\n\n\
             Start browsing: {}/books\n\n\
             Happy reading,\nThe BookHaven team\n",
            user.name, self.frontend_url
        );
        self.deliver(Email {
            to: user.email.clone(),
            subject: "Welcome to BookHaven".to_string(),
            body,
        })
        .await;
    }

    pub async fn order_confirmation(&self, user: &User, order: &Order) {
        let mut body = format!(
            "Hi {},\n\nThanks for your order {}.\n\n",
            user.name, order.order_number
        );
        for item in &order.items {
            body.push_str(&format!(
                "  {} x {} ({}) - {}\n",
                item.quantity,
                item.title,
                item.author,
                self.money(item.line_total_cents())
            ));
        }
        body.push_str(&format!("\nSubtotal: {}\n", self.money(order.subtotal_cents)));
        if order.discount_cents > 0 {
            body.push_str(&format!(
                "Discount ({}): -{}\n",
                order.coupon_code.as_deref().unwrap_or("coupon"),
                self.money(order.discount_cents)
            ));
        }
        body.push_str(&format!(
            "Shipping: {}\nTax: {}\nTotal: {}\n\n",
            self.money(order.shipping_cents),
            self.money(order.tax_cents),
            self.money(order.total_cents)
        ));
        let address = &order.shipping_address;
        body.push_str(&format!(
            "Shipping to:\n  {}\n  {}\n",
            address.name, address.line1
        ));
        if let Some(line2) = address.line2.as_deref().filter(|l| !l.is_empty()) {
            body.push_str(&format!("  {}\n", line2));
        }
        body.push_str(&format!(
            "  {} {}\n  {}\n\nPaid with card ending in {}.\n\
             Track your order: {}/orders/{}\n",
            address.postal_code,
            address.city,
            address.country,
            order.payment_last4,
            self.frontend_url,
            order.id
        ));

        self.deliver(Email {
            to: user.email.clone(),
            subject: format!("Order confirmation {}", order.order_number),
            body,
        })
        .await;
    }

    pub async fn order_status_changed(&self, user: &User, order: &Order) {
        let detail = match order.status {
            OrderStatus::Pending => "is awaiting payment",
            OrderStatus::Paid => "has been paid",
            OrderStatus::Shipped => "is on its way",
            OrderStatus::Delivered => "has been delivered",
            OrderStatus::Cancelled => "has been cancelled",
        };
        let mut body = format!(
            "Hi {},\n\nYour order {} {}.\n",
            user.name, order.order_number, detail
        );
        if order.status == OrderStatus::Cancelled {
            body.push_str(&format!(
                "A refund of {} will be issued to the card ending in {}.\n",
                self.money(order.total_cents),
                order.payment_last4
            ));
        }
        body.push_str(&format!(
            "\nOrder details: {}/orders/{}\n",
            self.frontend_url, order.id
        ));

        self.deliver(Email {
            to: user.email.clone(),
            subject: format!("Order {} {}", order.order_number, order.status),
            body,
        })
        .await;
    }

    pub async fn password_reset(&self, user: &User, token: &str, valid_minutes: u64) {
        let body = format!(
            "Hi {},\n\n\
             We received a request to reset your BookHaven password.\n\
             Open the link below within {} minutes to choose a new one:\n\n\
             {}/reset-password?token={}\n\n\
             If you did not request this, you can ignore this email.\n",
            user.name, valid_minutes, self.frontend_url, token
        );
        self.deliver(Email {
            to: user.email.clone(),
            subject: "Reset your BookHaven password".to_string(),
            body,
        })
        .await;
    }
}

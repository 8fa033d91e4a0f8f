//! Status and role enums for orders and users.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown enum value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// What was being parsed (e.g. "order status").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Order lifecycle status.
///
/// Admins set the status directly; there is no enforced transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Label shown to the customer on their order history.
    #[must_use]
    pub const fn customer_label(&self) -> &'static str {
        match self {
            Self::Pending => "Menunggu Pembayaran",
            Self::Processing => "Diproses",
            Self::Shipped => "Dikirim",
            Self::Delivered => "Selesai",
            Self::Cancelled => "Dibatalkan",
        }
    }

    /// Label shown in the back office.
    #[must_use]
    pub const fn admin_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Diproses",
            Self::Shipped => "Dikirim",
            Self::Delivered => "Selesai",
            Self::Cancelled => "Dibatalkan",
        }
    }

    /// English chart label used by reports.
    #[must_use]
    pub const fn report_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("order status", s))
    }
}

/// Storefront user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Back-office access to catalog, orders and reports.
    Admin,
    /// Regular shopper. Every self-registered account starts here.
    #[default]
    Customer,
}

impl UserRole {
    /// Whether this role may use the back office.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Customer => write!(f, "customer"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            _ => Err(ParseEnumError::new("user role", s)),
        }
    }
}

/// Payment method chosen at checkout.
///
/// Orders store the human-readable [`PaymentMethod::display_name`], not the
/// form value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    #[default]
    BankTransfer,
    #[serde(rename = "ewallet")]
    EWallet,
    CreditCard,
}

impl PaymentMethod {
    /// Every method, in the order the checkout form lists them.
    pub const ALL: [Self; 3] = [Self::BankTransfer, Self::EWallet, Self::CreditCard];

    /// Name recorded on the order.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::BankTransfer => "Bank Transfer - BCA",
            Self::EWallet => "E-Wallet - GoPay",
            Self::CreditCard => "Credit Card",
        }
    }

    /// Form value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank-transfer",
            Self::EWallet => "ewallet",
            Self::CreditCard => "credit-card",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank-transfer" => Ok(Self::BankTransfer),
            "ewallet" => Ok(Self::EWallet),
            "credit-card" => Ok(Self::CreditCard),
            _ => Err(ParseEnumError::new("payment method", s)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_order_status_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Delivered).unwrap();
        assert_eq!(json, "\"delivered\"");
    }

    #[test]
    fn test_order_status_labels() {
        assert_eq!(OrderStatus::Pending.customer_label(), "Menunggu Pembayaran");
        assert_eq!(OrderStatus::Pending.admin_label(), "Pending");
        assert_eq!(OrderStatus::Shipped.report_label(), "Shipped");
    }

    #[test]
    fn test_user_role() {
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Customer.is_admin());
        assert_eq!(UserRole::default(), UserRole::Customer);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("root".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_payment_method_wire_values() {
        let m: PaymentMethod = serde_json::from_str("\"ewallet\"").unwrap();
        assert_eq!(m, PaymentMethod::EWallet);
        let m: PaymentMethod = serde_json::from_str("\"bank-transfer\"").unwrap();
        assert_eq!(m.display_name(), "Bank Transfer - BCA");
        assert_eq!(
            "credit-card".parse::<PaymentMethod>().unwrap().display_name(),
            "Credit Card"
        );
    }
}

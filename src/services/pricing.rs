//! 订单金额计算（单位：分）

use serde::Serialize;
use ts_rs::TS;

use crate::config::{ShopConfig, TS_EXPORT_PATH};

/// 运费与税率规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    pub shipping_flat_cents: i64,
    pub free_shipping_threshold_cents: i64,
    /// 万分比
    pub tax_rate_bps: i64,
}

impl From<&ShopConfig> for PricingRules {
    fn from(shop: &ShopConfig) -> Self {
        Self {
            shipping_flat_cents: shop.shipping_flat_cents,
            free_shipping_threshold_cents: shop.free_shipping_threshold_cents,
            tax_rate_bps: shop.tax_rate_bps,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PriceQuote {
    #[ts(type = "number")]
    pub subtotal_cents: i64,
    #[ts(type = "number")]
    pub discount_cents: i64,
    #[ts(type = "number")]
    pub shipping_cents: i64,
    #[ts(type = "number")]
    pub tax_cents: i64,
    #[ts(type = "number")]
    pub total_cents: i64,
}

impl PricingRules {
    /// 计算报价
    ///
    /// - 折扣被限制在 [0, subtotal]
    /// - 空购物车或折后金额达到包邮门槛时免运费
    /// - 税 = 折后金额 * bps / 10000，四舍五入；bps 上限 10000
    pub fn quote(&self, subtotal_cents: i64, discount_cents: i64) -> PriceQuote {
        let subtotal = subtotal_cents.max(0);
        let discount = discount_cents.clamp(0, subtotal);
        let taxable = subtotal - discount;

        let shipping = if subtotal == 0 || taxable >= self.free_shipping_threshold_cents {
            0
        } else {
            self.shipping_flat_cents.max(0)
        };

        let tax = (taxable * self.tax_rate_bps.clamp(0, 10_000) + 5_000) / 10_000;

        PriceQuote {
            subtotal_cents: subtotal,
            discount_cents: discount,
            shipping_cents: shipping,
            tax_cents: tax,
            total_cents: taxable + shipping + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(tax_rate_bps: i64) -> PricingRules {
        PricingRules {
            shipping_flat_cents: 499,
            free_shipping_threshold_cents: 3500,
            tax_rate_bps,
        }
    }

    #[test]
    fn test_flat_shipping_below_threshold() {
        let q = rules(0).quote(2000, 0);
        assert_eq!(q.shipping_cents, 499);
        assert_eq!(q.total_cents, 2499);
    }

    #[test]
    fn test_free_shipping_uses_discounted_amount() {
        assert_eq!(rules(0).quote(3500, 0).shipping_cents, 0);
        // 折后低于门槛，恢复运费
        let q = rules(0).quote(3600, 200);
        assert_eq!(q.shipping_cents, 499);
        assert_eq!(q.total_cents, 3400 + 499);
    }

    #[test]
    fn test_empty_cart_is_free() {
        let q = rules(825).quote(0, 0);
        assert_eq!(q, PriceQuote {
            subtotal_cents: 0,
            discount_cents: 0,
            shipping_cents: 0,
            tax_cents: 0,
            total_cents: 0,
        });
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 1000 * 825 / 10000 = 82.5 → 83
        assert_eq!(rules(825).quote(1000, 0).tax_cents, 83);
        // 999 * 825 / 10000 = 82.41 → 82
        assert_eq!(rules(825).quote(999, 0).tax_cents, 82);
    }

    #[test]
    fn test_discount_is_clamped() {
        let q = rules(0).quote(1000, 5000);
        assert_eq!(q.discount_cents, 1000);
        assert_eq!(q.total_cents, 499);

        assert_eq!(rules(0).quote(1000, -50).discount_cents, 0);
    }

    #[test]
    fn test_tax_rate_out_of_range() {
        assert_eq!(rules(50_000).quote(1000, 0).tax_cents, 1000);
        assert_eq!(rules(-825).quote(1000, 0).tax_cents, 0);
    }
}

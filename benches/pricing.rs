//! 结账金额计算基准测试

use std::hint::black_box;

use bookhaven::services::coupon_service::discount_for;
use bookhaven::services::pricing::PricingRules;
use bookhaven::storage::{Coupon, DiscountType};
use bookhaven::utils::csv_handler::{format_price, parse_price};
use chrono::Utc;
use criterion::{Criterion, criterion_group, criterion_main};

fn rules() -> PricingRules {
    PricingRules {
        shipping_flat_cents: 499,
        free_shipping_threshold_cents: 3500,
        tax_rate_bps: 825,
    }
}

fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
    Coupon {
        id: 1,
        code: "BENCH".to_string(),
        description: String::new(),
        discount_type,
        value,
        min_order_cents: 0,
        max_uses: None,
        used_count: 0,
        expires_at: None,
        active: true,
        created_at: Utc::now(),
    }
}

fn bench_quote(c: &mut Criterion) {
    let rules = rules();
    let percent = coupon(DiscountType::Percentage, 15);
    let fixed = coupon(DiscountType::Fixed, 500);

    let mut group = c.benchmark_group("pricing/quote");

    group.bench_function("no_coupon", |b| {
        b.iter(|| rules.quote(black_box(2_999), 0));
    });

    group.bench_function("percentage_coupon", |b| {
        b.iter(|| {
            let subtotal = black_box(12_345);
            rules.quote(subtotal, discount_for(&percent, subtotal))
        });
    });

    group.bench_function("fixed_coupon", |b| {
        b.iter(|| {
            let subtotal = black_box(1_200);
            rules.quote(subtotal, discount_for(&fixed, subtotal))
        });
    });

    group.finish();
}

fn bench_price_text(c: &mut Criterion) {
    c.bench_function("pricing/parse_price", |b| {
        b.iter(|| parse_price(black_box("$1234.5")));
    });
    c.bench_function("pricing/format_price", |b| {
        b.iter(|| format_price(black_box(123_450)));
    });
}

criterion_group!(benches, bench_quote, bench_price_text);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use matchbook::{Order, OrderBook, OrderType, Sequence, Side};

fn limit_order(side: Side, price: Decimal, quantity: Decimal) -> Order {
    Order::new(
        Uuid::new_v4(),
        "BTC-USDT",
        OrderType::Limit,
        side,
        Some(price),
        quantity,
    )
}

/// A book with `levels` ask levels of `per_level` orders each, starting at 50000.00.
fn seeded_book(levels: i64, per_level: usize) -> (OrderBook, Sequence) {
    let mut book = OrderBook::new("BTC-USDT", 2, 6);
    let seq = Sequence::new();
    for level in 0..levels {
        let price = dec!(50000.00) + Decimal::from(level);
        for _ in 0..per_level {
            book.submit(limit_order(Side::Sell, price, dec!(0.1)), &seq);
        }
    }
    (book, seq)
}

fn orderbook_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_operations");

    group.bench_function("submit_resting_limit", |b| {
        let mut book = OrderBook::new("BTC-USDT", 2, 6);
        let seq = Sequence::new();
        b.iter(|| {
            let order = limit_order(Side::Buy, dec!(49000.00), dec!(0.001));
            black_box(book.submit(order, &seq));
        });
    });

    group.bench_function("submit_crossing_market_10_levels", |b| {
        b.iter_batched(
            || seeded_book(10, 5),
            |(mut book, seq)| {
                let order = Order::new(
                    Uuid::new_v4(),
                    "BTC-USDT",
                    OrderType::Market,
                    Side::Buy,
                    None,
                    dec!(4.0),
                );
                black_box(book.submit(order, &seq));
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("cancel_resting_order", |b| {
        b.iter_batched(
            || {
                let mut book = OrderBook::new("BTC-USDT", 2, 6);
                let seq = Sequence::new();
                let result = book.submit(limit_order(Side::Buy, dec!(49000.00), dec!(1.0)), &seq);
                (book, result.order.id)
            },
            |(mut book, order_id)| {
                black_box(book.cancel(order_id));
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("snapshot_depth_20", |b| {
        let (book, _seq) = seeded_book(50, 4);
        b.iter(|| black_box(book.snapshot(20)));
    });

    group.finish();
}

criterion_group!(benches, orderbook_benchmark);
criterion_main!(benches);

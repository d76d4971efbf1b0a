//! Compare a persistence diagram with a noisy copy of itself.
//!
//! Builds a diagram of a few strong features, perturbs it, adds low
//! persistence noise on the second side, and prints the distance under several
//! orders along with the matching.
//!
//! Run: RUST_LOG=debug cargo run --example compare_diagrams -- [order] [percent]
//!
//! `order` is `inf` or a positive integer (default 2); `percent` is the
//! relevance threshold in [0, 100] (default 0).

use pdwass::{CriticalPoint, DiagramDistance, DistanceConfig, Order, PersistencePair, Which};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;

fn feature(kind: usize, birth: f64, death: f64, x: f64) -> PersistencePair {
    let b = CriticalPoint::new(birth, x, 0.0, 0.0);
    let d = CriticalPoint::new(death, x + 0.1, 0.0, 0.0);
    match kind % 3 {
        0 => PersistencePair::minimum(b, d),
        1 => PersistencePair::saddle(b, d),
        _ => PersistencePair::maximum(b, d),
    }
}

fn main() -> pdwass::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let order: Order = args.next().as_deref().unwrap_or("2").parse()?;
    let percent: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let jitter = Normal::new(0.0, 0.05).unwrap();

    let clean: Vec<PersistencePair> = (0..8)
        .map(|i| {
            let birth = i as f64 * 0.3;
            feature(i, birth, birth + 1.0 + i as f64 * 0.5, i as f64)
        })
        .collect();

    let mut noisy: Vec<PersistencePair> = clean
        .iter()
        .map(|p| {
            let kind = match p.pair_type {
                pdwass::PairType::Minimum => 0,
                pdwass::PairType::Saddle => 1,
                pdwass::PairType::Maximum => 2,
            };
            feature(
                kind,
                p.birth.value + rng.sample(jitter),
                p.death.value + rng.sample(jitter),
                p.birth.x + rng.sample(jitter),
            )
        })
        .collect();
    for i in 0..6 {
        let birth = rng.gen_range(0.0..3.0);
        noisy.push(feature(i, birth, birth + rng.gen_range(0.01..0.2), rng.gen_range(0.0..8.0)));
    }

    println!("clean: {} pairs, noisy: {} pairs", clean.len(), noisy.len());

    for o in [Order::Wasserstein(1), Order::Wasserstein(2), Order::Bottleneck] {
        let cfg = DistanceConfig {
            relevance_percent_threshold: percent,
            ..DistanceConfig::with_order(o)
        };
        let d = pdwass::distance(&clean, &noisy, &cfg)?;
        println!("  order {:>3}: {:.4}", o.to_string(), d);
    }

    let cfg = DistanceConfig {
        relevance_percent_threshold: percent,
        ..DistanceConfig::with_order(order)
    };
    let dd = DiagramDistance::new(cfg)?;
    let report = dd.compute(&clean, &noisy)?;

    println!();
    println!(
        "order {} (threshold {:.3}): distance {:.4}",
        dd.config().order,
        report.threshold,
        report.distance
    );
    for m in &report.matchings {
        println!(
            "  clean[{}] ({:.2}, {:.2}) <-> noisy[{}] ({:.2}, {:.2})  cost {:.4}",
            m.first,
            clean[m.first].birth.value,
            clean[m.first].death.value,
            m.second,
            noisy[m.second].birth.value,
            noisy[m.second].death.value,
            m.cost
        );
    }
    for k in &report.killed {
        let side = match k.diagram {
            Which::First => "clean",
            Which::Second => "noisy",
        };
        println!("  {}[{}] -> diagonal  cost {:.4}", side, k.index, k.cost);
    }
    if !report.converged {
        println!("warning: solver hit its step cap");
    }
    Ok(())
}

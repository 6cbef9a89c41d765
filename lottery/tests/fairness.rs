//! Statistical fairness of the draw: every waiting entrant must be equally
//! likely to be selected when there are more entrants than seats.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use tombola_core::environment::ThreadRngSampler;
use tombola_lottery::{Capacity, Entrant, EntrantId, EventRoster};

fn entrants(n: usize) -> Vec<Entrant> {
    (0..n)
        .map(|i| Entrant::new(format!("Entrant {i}"), format!("entrant{i}@example.com")))
        .collect()
}

/// Chi-square goodness-of-fit against the uniform expectation.
///
/// 5 entrants, 2 seats, 5000 draws: each entrant expects 2000 selections.
/// The critical value for 4 degrees of freedom at significance 1e-4 is
/// 23.5, so a correct implementation fails this test about once in ten
/// thousand runs while a "take the first n" selection fails it immediately.
#[test]
fn draw_selects_uniformly_without_replacement() {
    const TRIALS: usize = 5_000;
    const SEATS: u32 = 2;

    let pool = entrants(5);
    let index_of: HashMap<EntrantId, usize> = pool
        .iter()
        .enumerate()
        .map(|(index, entrant)| (entrant.id, index))
        .collect();
    let mut counts = [0usize; 5];
    let sampler = ThreadRngSampler;

    for _ in 0..TRIALS {
        let mut roster = EventRoster::new(Capacity::new(SEATS), None);
        for entrant in &pool {
            roster.join(entrant.clone()).unwrap();
        }

        let selected = roster.draw(&sampler).unwrap();
        assert_eq!(selected.len(), SEATS as usize);
        for entrant in selected {
            counts[index_of[&entrant.id]] += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let expected = (TRIALS * SEATS as usize) as f64 / 5.0;
    #[allow(clippy::cast_precision_loss)]
    let chi_square: f64 = counts
        .iter()
        .map(|&count| {
            let delta = count as f64 - expected;
            delta * delta / expected
        })
        .sum();

    assert!(
        chi_square < 23.5,
        "draw distribution is skewed: chi-square {chi_square:.2}, counts {counts:?}"
    );
}

/// Every 2-subset of a 4-entrant waiting list should appear; a biased
/// selection that always anchors on one entrant cannot produce all six.
#[test]
fn draw_reaches_every_subset() {
    let pool = entrants(4);
    let sampler = ThreadRngSampler;
    let mut seen = std::collections::HashSet::new();

    for _ in 0..500 {
        let mut roster = EventRoster::new(Capacity::new(2), None);
        for entrant in &pool {
            roster.join(entrant.clone()).unwrap();
        }
        let mut ids: Vec<EntrantId> = roster
            .draw(&sampler)
            .unwrap()
            .into_iter()
            .map(|entrant| entrant.id)
            .collect();
        ids.sort_unstable();
        seen.insert(ids);
    }

    assert_eq!(seen.len(), 6, "some 2-subsets were never drawn");
}

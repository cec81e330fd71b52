// confidence scoring
//
// Computed in hundredths so the band boundaries (0.5, 0.8) are hit exactly.
// Consistency only touches fallback symbols and never exceeds the fuzzy bonus:
// a stronger provenance never scores below a weaker one.
use crate::core::engine::MappingEngine;
use crate::core::types::{ComponentKind, Provenance, RecordText, Resolution};

const BASE: i32 = 50;
const CONSISTENCY: i32 = 10;

//per resolved side; fuzzy sits CONSISTENCY above fallback
fn provenance_bonus(p: Provenance) -> i32 {
    match p {
        Provenance::Exact => 30,
        Provenance::Pattern => 20,
        Provenance::Keyword => 15,
        Provenance::Fuzzy => CONSISTENCY,
        Provenance::Fallback => 0,
    }
}

//a fallback generic symbol is only credible when the description says the same thing
fn consistency(symbol: &Resolution, text: &RecordText) -> i32 {
    if symbol.provenance != Provenance::Fallback {
        return 0;
    }
    match ComponentKind::from_generic_symbol(&symbol.canonical) {
        None | Some(ComponentKind::Generic) => -CONSISTENCY,
        Some(kind) if kind.matches(&text.description) => CONSISTENCY,
        Some(_) => -CONSISTENCY,
    }
}

impl MappingEngine {
    /// Reliability of a mapping in [0, 1].
    pub fn score(&self, symbol: &Resolution, footprint: &Resolution, text: &RecordText) -> f64 {
        let total = BASE
            + provenance_bonus(symbol.provenance)
            + provenance_bonus(footprint.provenance)
            + consistency(symbol, text);
        f64::from(total.clamp(0, 100)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER: [Provenance; 5] = [
        Provenance::Exact,
        Provenance::Pattern,
        Provenance::Keyword,
        Provenance::Fuzzy,
        Provenance::Fallback,
    ];

    fn mk(canonical: &str, p: Provenance) -> Resolution {
        Resolution::new(canonical, p)
    }

    #[test]
    fn exact_on_both_sides_clamps_to_one() {
        let e = MappingEngine::default();
        let text = RecordText::from_description("10k Ohm Resistor");
        let c = e.score(&mk("Custom:R", Provenance::Exact), &mk("Custom:0603", Provenance::Exact), &text);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn keyword_on_both_sides_is_medium() {
        let e = MappingEngine::default();
        let text = RecordText::from_description("10k Ohm Resistor");
        let fp = mk("Resistor_SMD:R_0603_1608Metric", Provenance::Keyword);
        assert_eq!(e.score(&mk("Device:R", Provenance::Keyword), &fp, &text), 0.8);
    }

    #[test]
    fn fallback_symbol_consistency() {
        let e = MappingEngine::default();
        let fp = mk("Resistor_SMD:R_0603_1608Metric", Provenance::Keyword);

        let agrees = e.score(&mk("Device:R", Provenance::Fallback), &fp, &RecordText::from_description("resistor"));
        let disagrees = e.score(&mk("Device:R", Provenance::Fallback), &fp, &RecordText::from_description("crystal"));
        assert_eq!(agrees, 0.75);
        assert_eq!(disagrees, 0.55);

        //generic U never earns the bonus
        let u = e.score(&mk("Device:U", Provenance::Fallback), &mk("x", Provenance::Fallback), &RecordText::default());
        assert_eq!(u, 0.4);

        //resolved generics are not second-guessed
        let kw = e.score(&mk("Device:R", Provenance::Keyword), &fp, &RecordText::from_description("crystal"));
        assert_eq!(kw, 0.8);
    }

    ///every canonical a step could land on, under every description: the worst
    ///score of a stronger step is still >= the best score of the next weaker one
    #[test]
    fn stronger_provenance_never_scores_lower_for_any_canonical() {
        let e = MappingEngine::default();
        let symbols = ["Device:R", "Device:C", "Device:U", "Device:LED", "Custom:R"];
        let texts = [
            RecordText::from_description("resistor"),
            RecordText::from_description("crystal capacitor load"),
            RecordText::from_description("10 ohm"),
            RecordText::default(),
        ];

        for text in &texts {
            for fp in ORDER {
                let footprint = mk("fp", fp);
                let range = |p: Provenance| {
                    let scores: Vec<f64> = symbols.iter().map(|s| e.score(&mk(s, p), &footprint, text)).collect();
                    let lo = scores.iter().copied().fold(f64::INFINITY, f64::min);
                    let hi = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    (lo, hi)
                };
                for w in ORDER.windows(2) {
                    let (stronger_lo, _) = range(w[0]);
                    let (_, weaker_hi) = range(w[1]);
                    assert!(stronger_lo >= weaker_hi, "{:?} vs {:?} on {:?}", w[0], w[1], text.description);
                }
            }
        }
    }

    #[test]
    fn footprint_side_is_monotone_too() {
        let e = MappingEngine::default();
        let text = RecordText::from_description("resistor");
        for symbol in [mk("Device:R", Provenance::Fallback), mk("Custom:R", Provenance::Exact)] {
            let scores: Vec<f64> = ORDER.iter().map(|&p| e.score(&symbol, &mk("fp", p), &text)).collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        }
    }
}

/// The single gate separating execution from a clarification turn (spec.md
/// §4.6 "Confidence gate ... a single named constant").
pub const CONFIDENCE_GATE: f64 = 0.85;

use serde::{Deserialize, Serialize};

/// One espresso shot as recorded by the service.
///
/// The service uses short wire names (`in`, `out`, `time`); the long names
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub id: i64,
    #[serde(rename = "in", alias = "in_grams")]
    pub in_grams: f64,
    #[serde(rename = "out", alias = "out_grams")]
    pub out_grams: f64,
    #[serde(rename = "time", alias = "time_seconds")]
    pub time_seconds: u32,
    #[serde(default)]
    pub grind: Option<i32>,
    #[serde(
        rename = "nextExtractionHint",
        alias = "next_extraction_hint",
        default
    )]
    pub next_extraction_hint: Option<String>,
}

impl Extraction {
    /// Brew ratio (output over input mass). None when the dose is not positive.
    pub fn ratio(&self) -> Option<f64> {
        if self.in_grams > 0.0 {
            Some(self.out_grams / self.in_grams)
        } else {
            None
        }
    }

    pub fn ratio_display(&self) -> String {
        match self.ratio() {
            Some(ratio) => format!("{:.1}:1", ratio),
            None => "N/A".to_string(),
        }
    }

    pub fn grind_display(&self) -> String {
        self.grind
            .map(|g| g.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    /// Hint for the next shot, ignoring blank hints
    pub fn hint(&self) -> Option<&str> {
        self.next_extraction_hint
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }
}

/// Sort extractions so the most recent (highest id) comes first.
pub fn sort_newest_first(extractions: &mut [Extraction]) {
    extractions.sort_by(|a, b| b.id.cmp(&a.id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(id: i64, in_grams: f64, out_grams: f64) -> Extraction {
        Extraction {
            id,
            in_grams,
            out_grams,
            time_seconds: 28,
            grind: None,
            next_extraction_hint: None,
        }
    }

    #[test]
    fn test_parse_wire_names() {
        let json = r#"{"id": 105, "in": 18.2, "out": 38.5, "time": 28, "grind": 4, "nextExtractionHint": "Grind a bit finer"}"#;
        let e: Extraction = serde_json::from_str(json).expect("Failed to parse extraction JSON");
        assert_eq!(e.id, 105);
        assert_eq!(e.in_grams, 18.2);
        assert_eq!(e.out_grams, 38.5);
        assert_eq!(e.time_seconds, 28);
        assert_eq!(e.grind, Some(4));
        assert_eq!(e.hint(), Some("Grind a bit finer"));
    }

    #[test]
    fn test_parse_missing_optionals() {
        let json = r#"{"id": 104, "in": 18.0, "out": 36.0, "time": 35}"#;
        let e: Extraction = serde_json::from_str(json).expect("Failed to parse extraction JSON");
        assert_eq!(e.grind, None);
        assert_eq!(e.hint(), None);
        assert_eq!(e.grind_display(), "N/A");
    }

    #[test]
    fn test_parse_long_names() {
        let json = r#"{"id": 7, "in_grams": 18.0, "out_grams": 40.0, "time_seconds": 30, "next_extraction_hint": null}"#;
        let e: Extraction = serde_json::from_str(json).expect("Failed to parse extraction JSON");
        assert_eq!(e.out_grams, 40.0);
        assert_eq!(e.time_seconds, 30);
    }

    #[test]
    fn test_ratio_display() {
        assert_eq!(shot(1, 18.0, 36.0).ratio_display(), "2.0:1");
        assert_eq!(shot(1, 18.2, 38.5).ratio_display(), "2.1:1");
        assert_eq!(shot(1, 0.0, 36.0).ratio_display(), "N/A");
        assert_eq!(shot(1, 0.0, 36.0).ratio(), None);
    }

    #[test]
    fn test_blank_hint_is_absent() {
        let mut e = shot(1, 18.0, 36.0);
        e.next_extraction_hint = Some("   ".to_string());
        assert_eq!(e.hint(), None);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut shots = vec![shot(103, 18.5, 40.0), shot(105, 18.2, 38.5), shot(104, 18.0, 36.0)];
        sort_newest_first(&mut shots);
        let ids: Vec<i64> = shots.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![105, 104, 103]);
    }
}

//! Deterministic cache keys for search paths
use super::FilterParams;
use std::fmt::{self, Write};

/// Identifies the result of one search path over one catalog.
///
/// `namespace` is the catalog fingerprint. `text` encodes every step of the path
/// as `<len>-<term>_m<len>-<marker>_b<bonus>_t<threshold>_r<0|1>`, steps joined
/// with `+`. Terms and marker are length-prefixed so no separator inside them can
/// make two different paths collide, and the numbers are written exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: String,
    pub text: String,
}

fn push_step(text: &mut String, term: &str, params: &FilterParams) {
    let term = term.trim().to_lowercase();
    let marker = &params.column_marker;
    // `{}` on f64 is the shortest representation that parses back to the same value.
    let _ = write!(
        text,
        "{}-{term}_m{}-{marker}_b{}_t{}_r{}",
        term.len(),
        marker.len(),
        params.literal_match_bonus,
        params.retention_threshold,
        u8::from(params.raw)
    );
}

impl CacheKey {
    /// Key for `terms` applied in order, all with the same `params`
    pub fn new<S: AsRef<str>>(namespace: &str, terms: &[S], params: &FilterParams) -> Self {
        Self::from_steps(namespace, terms.iter().map(|t| (t.as_ref(), params)))
    }

    /// Key for a path whose steps each carry their own parameters
    pub fn from_steps<'a, I>(namespace: &str, steps: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a FilterParams)>,
    {
        let mut text = String::new();
        for (i, (term, params)) in steps.into_iter().enumerate() {
            if i > 0 {
                text.push('+');
            }
            push_step(&mut text, term, params);
        }
        Self {
            namespace: namespace.to_string(),
            text,
        }
    }

    /// File name stem: the key itself when short and path-safe, its digest otherwise
    pub fn file_stem(&self, verbatim_limit: usize) -> String {
        let safe = self
            .text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '=' | '+' | '-'));
        if safe && self.text.len() <= verbatim_limit {
            self.text.clone()
        } else {
            blake3::hash(self.text.as_bytes()).to_hex().to_string()
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let params = FilterParams::default();
        let a = CacheKey::new("ns", &["GDP", "policy"], &params);
        let b = CacheKey::new("ns", &["gdp ".to_string(), "Policy".to_string()], &params);
        assert_eq!(a, b);
        assert_eq!(a.text, "3-gdp_m5-title_b0.2_t0.3_r0+6-policy_m5-title_b0.2_t0.3_r0");
    }

    #[test]
    fn test_key_depends_on_order_and_params() {
        let params = FilterParams::default();
        let a = CacheKey::new("ns", &["gdp", "policy"], &params);
        let b = CacheKey::new("ns", &["policy", "gdp"], &params);
        assert_ne!(a, b);

        let raw = FilterParams {
            raw: true,
            ..FilterParams::default()
        };
        assert_ne!(a, CacheKey::new("ns", &["gdp", "policy"], &raw));
    }

    #[test]
    fn test_separator_inside_term() {
        let params = FilterParams::default();
        let joined = CacheKey::new("ns", &["rail+network"], &params);
        let split = CacheKey::new("ns", &["rail", "network"], &params);
        assert_ne!(joined, split);

        let tricky = CacheKey::new("ns", &["rail_m5-title_b0.2_t0.3_r0+7-network"], &params);
        assert_ne!(tricky, split);
    }

    #[test]
    fn test_params_recorded_per_step() {
        let default = FilterParams::default();
        let raw = FilterParams {
            raw: true,
            ..FilterParams::default()
        };
        let mixed = CacheKey::from_steps("ns", [("rail", &raw), ("network", &default)]);
        let plain = CacheKey::new("ns", &["rail", "network"], &default);
        assert_ne!(mixed, plain);
    }

    #[test]
    fn test_marker_case_is_kept() {
        let upper = FilterParams {
            column_marker: "Title".into(),
            ..FilterParams::default()
        };
        let lower = FilterParams::default();
        assert_ne!(
            CacheKey::new("ns", &["gdp"], &upper),
            CacheKey::new("ns", &["gdp"], &lower)
        );
    }

    #[test]
    fn test_numbers_are_exact() {
        let near = FilterParams {
            retention_threshold: 0.30004,
            ..FilterParams::default()
        };
        let a = CacheKey::new("ns", &["gdp"], &FilterParams::default());
        let b = CacheKey::new("ns", &["gdp"], &near);
        assert_ne!(a, b);
        assert!(b.text.contains("_t0.30004_"));
    }

    #[test]
    fn test_file_stem() {
        let params = FilterParams::default();
        let short = CacheKey::new("ns", &["gdp"], &params);
        assert_eq!(short.file_stem(64), short.text);

        let spaced = CacheKey::new("ns", &["gross domestic product"], &params);
        let stem = spaced.file_stem(64);
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));

        assert_ne!(short.file_stem(8), short.text);
    }
}

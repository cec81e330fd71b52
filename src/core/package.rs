// package/size token extraction
//
// Pattern order is part of the contract: a bare SMD size beats a family name,
// so "SOT-223" yields "223" and never reaches the SOT pattern.
use regex::{Regex, RegexBuilder};
use tracing::error;

struct PackagePattern {
    regex: Regex,
    //None: the capture is the token; Some(f): token is "f-<capture>"
    family: Option<&'static str>,
}

pub struct PackageSizeExtractor {
    patterns: Vec<PackagePattern>,
}

const PATTERNS: [(&str, Option<&str>); 10] = [
    //smd sizes
    (r"(\d{3,4})$", None),
    (r"(\d{3,4})[^0-9]", None),
    (r"_(\d{3,4})_", None),
    //named families
    (r"SOT-?(\d+(?:-\d+)?)", Some("SOT")),
    (r"SOIC-?(\d+)", Some("SOIC")),
    (r"TSSOP-?(\d+)", Some("TSSOP")),
    (r"(?:^|[^A-Z])QFP-?(\d+)", Some("QFP")),
    (r"LQFP-?(\d+)", Some("LQFP")),
    (r"QFN-?(\d+)", Some("QFN")),
    (r"DIP-?(\d+)", Some("DIP")),
];

impl Default for PackageSizeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageSizeExtractor {
    pub fn new() -> Self {
        let patterns = PATTERNS
            .iter()
            .filter_map(|&(src, family)| {
                match RegexBuilder::new(src).case_insensitive(true).build() {
                    Ok(regex) => Some(PackagePattern { regex, family }),
                    Err(e) => {
                        error!("package pattern {src} rejected: {e}");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// First pattern (in order) that matches `text`.
    pub fn extract_from(&self, text: &str) -> Option<String> {
        self.patterns.iter().find_map(|p| {
            let caps = p.regex.captures(text)?;
            let token = caps.get(1)?.as_str();
            Some(match p.family {
                None => token.to_string(),
                Some(family) => format!("{family}-{token}"),
            })
        })
    }

    /// Tries the footprint name, then the "Package" attribute, then the description.
    pub fn extract(&self, footprint: &str, package: Option<&str>, description: &str) -> Option<String> {
        [Some(footprint), package, Some(description)]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .find_map(|s| self.extract_from(s))
    }
}

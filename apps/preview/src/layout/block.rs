//! Block model: the unit of content the pagination engine places on pages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every kind of block a CV can contain. At most one block per kind per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    RecruitmentBanner,
    Header,
    Summary,
    Experience,
    Education,
    Skills,
    Languages,
    Certifications,
    Projects,
}

impl BlockKind {
    /// Document order used when no user arrangement exists (and for kinds the
    /// arrangement does not mention).
    pub const DEFAULT_ORDER: [BlockKind; 9] = [
        BlockKind::RecruitmentBanner,
        BlockKind::Header,
        BlockKind::Summary,
        BlockKind::Experience,
        BlockKind::Education,
        BlockKind::Skills,
        BlockKind::Languages,
        BlockKind::Certifications,
        BlockKind::Projects,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::RecruitmentBanner => "recruitment-banner",
            BlockKind::Header => "header",
            BlockKind::Summary => "summary",
            BlockKind::Experience => "experience",
            BlockKind::Education => "education",
            BlockKind::Skills => "skills",
            BlockKind::Languages => "languages",
            BlockKind::Certifications => "certifications",
            BlockKind::Projects => "projects",
        }
    }

    /// Label shown in the block arrangement list.
    pub fn label(self) -> &'static str {
        match self {
            BlockKind::RecruitmentBanner => "Recruitment banner",
            BlockKind::Header => "Header",
            BlockKind::Summary => "Summary",
            BlockKind::Experience => "Experience",
            BlockKind::Education => "Education",
            BlockKind::Skills => "Skills",
            BlockKind::Languages => "Languages",
            BlockKind::Certifications => "Certifications",
            BlockKind::Projects => "Projects",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown block kind '{0}'")]
pub struct UnknownBlockKind(pub String);

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::DEFAULT_ORDER
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownBlockKind(s.to_string()))
    }
}

/// One self-contained content unit destined for a single page.
///
/// `markup` is opaque to the pagination engine. `estimated_height_mm` is always a
/// finite value ≥ 0; construct through [`Block::new`] to get the clamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub kind: BlockKind,
    pub markup: String,
    pub estimated_height_mm: f32,
    pub pinned: bool,
}

impl Block {
    pub fn new(kind: BlockKind, markup: String, estimated_height_mm: f32) -> Self {
        Self {
            kind,
            markup,
            estimated_height_mm: sanitize_height(estimated_height_mm),
            pinned: false,
        }
    }
}

/// Negative and non-finite heights collapse to 0 so a pass never aborts on them.
pub fn sanitize_height(height_mm: f32) -> f32 {
    if height_mm.is_finite() && height_mm > 0.0 {
        height_mm
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_str_roundtrip_for_all_kinds() {
        for kind in BlockKind::DEFAULT_ORDER {
            assert_eq!(kind.as_str().parse::<BlockKind>(), Ok(kind));
        }
        assert!("footer".parse::<BlockKind>().is_err());
    }

    #[test]
    fn test_unknown_kind_error_message() {
        let err = "footer".parse::<BlockKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown block kind 'footer'");
    }

    #[test]
    fn test_kind_serde_is_kebab_case() {
        let json = serde_json::to_string(&BlockKind::RecruitmentBanner).unwrap();
        assert_eq!(json, "\"recruitment-banner\"");
    }

    #[test]
    fn test_block_new_clamps_degenerate_heights() {
        assert_eq!(Block::new(BlockKind::Summary, String::new(), -4.0).estimated_height_mm, 0.0);
        assert_eq!(Block::new(BlockKind::Summary, String::new(), f32::NAN).estimated_height_mm, 0.0);
        assert_eq!(
            Block::new(BlockKind::Summary, String::new(), f32::INFINITY).estimated_height_mm,
            0.0
        );
        assert_eq!(Block::new(BlockKind::Summary, String::new(), 12.5).estimated_height_mm, 12.5);
    }
}

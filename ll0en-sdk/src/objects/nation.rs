//! NationStates nation objects.

use serde::Deserialize;

/// Normalise a nation or region name to the lowercase, underscore form the
/// NationStates API and feed use (`"The Free Republic"` -> `"the_free_republic"`).
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Result of the `tgcanrecruit` + `region` shard query for one nation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecruitmentEligibility {
    /// Whether the nation may currently receive a recruitment telegram from
    /// the region named in the `from` parameter.
    pub can_recruit: bool,
    /// The region the nation currently resides in, as reported by the API.
    pub region: String,
}

#[derive(Debug, Deserialize)]
struct NationShards {
    #[serde(rename = "TGCANRECRUIT")]
    tg_can_recruit: u8,
    #[serde(rename = "REGION")]
    region: String,
}

impl RecruitmentEligibility {
    /// Parse the XML document returned by `api.cgi?nation=...&q=tgcanrecruit+region`.
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        let shards: NationShards = quick_xml::de::from_str(xml)?;
        Ok(Self {
            can_recruit: shards.tg_can_recruit == 1,
            region: shards.region,
        })
    }
}

//! Known vkBasalt settings, used to annotate a profile's parsed configuration for display.

use serde::Serialize;

use crate::parsed::{ConfigValue, ParsedConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Text,
    Float,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    /// Shader the parameter belongs to; `None` for global settings.
    pub effect: Option<&'static str>,
    pub kind: ParamKind,
    pub description: &'static str,
    pub default_value: &'static str,
    pub range: Option<(f64, f64)>,
    pub valid_values: &'static [&'static str],
}

const EFFECT_NAMES: &[&str] = &["cas", "dls", "fxaa", "smaa", "lut"];

const fn param(
    key: &'static str,
    effect: Option<&'static str>,
    kind: ParamKind,
    description: &'static str,
    default_value: &'static str,
) -> ParamSpec {
    ParamSpec {
        key,
        effect,
        kind,
        description,
        default_value,
        range: None,
        valid_values: &[],
    }
}

const fn ranged(spec: ParamSpec, min: f64, max: f64) -> ParamSpec {
    ParamSpec {
        range: Some((min, max)),
        ..spec
    }
}

const fn one_of(spec: ParamSpec, valid_values: &'static [&'static str]) -> ParamSpec {
    ParamSpec {
        valid_values,
        ..spec
    }
}

pub const PARAMS: &[ParamSpec] = &[
    one_of(
        param(
            "effects",
            None,
            ParamKind::Text,
            "Colon separated list of effects, run left to right",
            "cas",
        ),
        EFFECT_NAMES,
    ),
    param(
        "reshadeTexturePath",
        None,
        ParamKind::Text,
        "Path to reshade shaders textures directory",
        "/path/to/reshade-shaders/Textures",
    ),
    param(
        "reshadeIncludePath",
        None,
        ParamKind::Text,
        "Path to reshade shaders include directory",
        "/path/to/reshade-shaders/Shaders",
    ),
    one_of(
        param(
            "depthCapture",
            None,
            ParamKind::Text,
            "Enable or disable depth capture",
            "off",
        ),
        &["on", "off"],
    ),
    param(
        "toggleKey",
        None,
        ParamKind::Text,
        "Key that toggles the effects on/off",
        "Home",
    ),
    param(
        "enableOnLaunch",
        None,
        ParamKind::Boolean,
        "Sets if the effects are enabled when started",
        "True",
    ),
    ranged(
        param(
            "casSharpness",
            Some("cas"),
            ParamKind::Float,
            "Amount of sharpening in the CAS shader",
            "0.4",
        ),
        -1.0,
        1.0,
    ),
    ranged(
        param(
            "dlsSharpness",
            Some("dls"),
            ParamKind::Float,
            "Amount of sharpening in the Denoised Luma Sharpening shader",
            "0.5",
        ),
        0.0,
        1.0,
    ),
    ranged(
        param(
            "dlsDenoise",
            Some("dls"),
            ParamKind::Float,
            "Amount of denoising in the Denoised Luma Sharpening shader",
            "0.17",
        ),
        0.0,
        1.0,
    ),
    ranged(
        param(
            "fxaaQualitySubpix",
            Some("fxaa"),
            ParamKind::Float,
            "Sub-pixel aliasing removal; affects sharpness",
            "0.75",
        ),
        0.0,
        1.0,
    ),
    ranged(
        param(
            "fxaaQualityEdgeThreshold",
            Some("fxaa"),
            ParamKind::Float,
            "Minimum local contrast required to apply the algorithm",
            "0.125",
        ),
        0.063,
        0.333,
    ),
    ranged(
        param(
            "fxaaQualityEdgeThresholdMin",
            Some("fxaa"),
            ParamKind::Float,
            "Trims the algorithm from processing darks",
            "0.0312",
        ),
        0.0,
        0.0833,
    ),
    one_of(
        param(
            "smaaEdgeDetection",
            Some("smaa"),
            ParamKind::Text,
            "Edge detection shader",
            "luma",
        ),
        &["luma", "color"],
    ),
    ranged(
        param(
            "smaaThreshold",
            Some("smaa"),
            ParamKind::Float,
            "Edge detection sensitivity",
            "0.05",
        ),
        0.0,
        0.5,
    ),
    ranged(
        param(
            "smaaMaxSearchSteps",
            Some("smaa"),
            ParamKind::Integer,
            "Maximum steps in horizontal/vertical pattern searches",
            "32",
        ),
        0.0,
        112.0,
    ),
    ranged(
        param(
            "smaaMaxSearchStepsDiag",
            Some("smaa"),
            ParamKind::Integer,
            "Maximum steps in diagonal pattern searches",
            "16",
        ),
        0.0,
        20.0,
    ),
    ranged(
        param(
            "smaaCornerRounding",
            Some("smaa"),
            ParamKind::Integer,
            "How much sharp corners are rounded",
            "25",
        ),
        0.0,
        100.0,
    ),
    param(
        "lutFile",
        Some("lut"),
        ParamKind::Text,
        "Path to a .CUBE file or a .png with width == height * height",
        "/path/to/lut",
    ),
];

pub fn lookup(key: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|spec| spec.key == key)
}

impl ParamSpec {
    pub fn accepts(&self, value: &ConfigValue) -> bool {
        let kind_ok = match (self.kind, value) {
            (ParamKind::Text, ConfigValue::Text(_)) => true,
            // The backend decodes `on`/`off` style text as booleans.
            (ParamKind::Text, ConfigValue::Bool(_)) => !self.valid_values.is_empty(),
            (ParamKind::Float, ConfigValue::Float(_) | ConfigValue::Int(_)) => true,
            (ParamKind::Integer, ConfigValue::Int(_)) => true,
            (ParamKind::Boolean, ConfigValue::Bool(_)) => true,
            _ => false,
        };
        if !kind_ok {
            return false;
        }

        if let (Some((min, max)), Some(number)) = (self.range, value.as_f64()) {
            if number < min || number > max {
                return false;
            }
        }

        if self.valid_values.is_empty() {
            return true;
        }
        match value {
            ConfigValue::Text(text) if self.key == "effects" => text
                .split(':')
                .all(|effect| self.valid_values.contains(&effect.trim())),
            ConfigValue::Text(text) => self.valid_values.contains(&text.as_str()),
            ConfigValue::Bool(flag) => {
                let spelled = if *flag { "on" } else { "off" };
                self.valid_values.contains(&spelled)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedEntry {
    pub key: String,
    pub value: ConfigValue,
    pub spec: Option<&'static ParamSpec>,
    pub valid: bool,
}

/// Unknown keys pass through unannotated and count as valid.
pub fn annotate(parsed: &ParsedConfig) -> Vec<AnnotatedEntry> {
    parsed
        .iter()
        .map(|(key, value)| {
            let spec = lookup(key);
            AnnotatedEntry {
                key: key.clone(),
                value: value.clone(),
                spec,
                valid: spec.map_or(true, |spec| spec.accepts(value)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{annotate, lookup, ParamKind};
    use crate::parsed::{parse_config_text, ConfigValue};

    #[test]
    fn lookup_finds_global_and_shader_params() {
        let effects = lookup("effects").expect("effects is known");
        assert_eq!(effects.effect, None);

        let sharpness = lookup("casSharpness").expect("casSharpness is known");
        assert_eq!(sharpness.effect, Some("cas"));
        assert_eq!(sharpness.kind, ParamKind::Float);
        assert!(lookup("notAThing").is_none());
    }

    #[test]
    fn effects_list_members_must_all_be_known() {
        let spec = lookup("effects").expect("effects is known");
        assert!(spec.accepts(&ConfigValue::Text("cas:smaa".to_owned())));
        assert!(!spec.accepts(&ConfigValue::Text("cas:bloom".to_owned())));
    }

    #[test]
    fn ranges_are_inclusive() {
        let spec = lookup("smaaMaxSearchSteps").expect("known");
        assert!(spec.accepts(&ConfigValue::Int(112)));
        assert!(!spec.accepts(&ConfigValue::Int(113)));
        assert!(!spec.accepts(&ConfigValue::Float(4.5)));

        let cas = lookup("casSharpness").expect("known");
        assert!(cas.accepts(&ConfigValue::Int(-1)));
        assert!(!cas.accepts(&ConfigValue::Float(1.5)));
    }

    #[test]
    fn on_off_text_decoded_as_bool_is_accepted() {
        let spec = lookup("depthCapture").expect("known");
        assert!(spec.accepts(&ConfigValue::Bool(false)));
        assert!(spec.accepts(&ConfigValue::Text("on".to_owned())));
        assert!(!spec.accepts(&ConfigValue::Text("maybe".to_owned())));
    }

    #[test]
    fn annotate_flags_bad_values_and_keeps_unknown_keys() {
        let parsed = parse_config_text("effects = cas\ncasSharpness = 3.0\ncustomKey = 7\n");

        let entries = annotate(&parsed);

        let by_key = |key: &str| {
            entries
                .iter()
                .find(|entry| entry.key == key)
                .expect("entry should exist")
        };
        assert!(by_key("effects").valid);
        assert!(!by_key("casSharpness").valid);
        assert!(by_key("customKey").spec.is_none());
        assert!(by_key("customKey").valid);
    }
}

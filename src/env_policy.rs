//! Environment for the driven program.
//!
//! The child gets an explicit environment vector, never the parent's by
//! accident. Some variables are always stripped regardless of policy.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Environment variables that are ALWAYS stripped, even when listed explicitly.
///
/// These can inject code into the child or redirect what it loads.
pub const ALWAYS_STRIP: &[&str] = &[
    // Library injection
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "LD_AUDIT",
    "LD_DEBUG",
    "LD_PROFILE",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "DYLD_FRAMEWORK_PATH",
    "DYLD_FALLBACK_LIBRARY_PATH",
    // Kerberos and GSSAPI configuration overrides
    "KRB5_CONFIG",
    "KRB5_KTNAME",
    "KRB5CCNAME",
    "KRB5_TRACE",
    // Shell behavior
    "BASH_ENV",
    "ENV",
    "SHELLOPTS",
    "IFS",
    // Pagers and editors the tool might spawn
    "EDITOR",
    "VISUAL",
    "PAGER",
];

/// Policy for the environment passed to the child.
#[derive(Debug, Clone, Default)]
pub enum EnvPolicy {
    /// Pass an empty environment (default).
    #[default]
    Empty,

    /// Pass only `LANG=C` and `LC_ALL=C` so prompts are not localized.
    LocaleOnly,

    /// Pass exactly these variables. ALWAYS_STRIP is still applied.
    Fixed(HashMap<String, String>),

    /// Forward these keys from the parent's environment if set.
    /// ALWAYS_STRIP is still applied.
    Inherit(HashSet<String>),
}

impl EnvPolicy {
    /// Produce the final environment, sorted by key.
    pub fn apply(&self) -> BTreeMap<String, String> {
        // Non-UTF-8 entries are never forwarded
        self.apply_from(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Like [`EnvPolicy::apply`], reading inherited values from `parent`.
    pub fn apply_from<I>(&self, parent: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut result: BTreeMap<String, String> = match self {
            EnvPolicy::Empty => BTreeMap::new(),

            EnvPolicy::LocaleOnly => BTreeMap::from([
                ("LANG".to_string(), "C".to_string()),
                ("LC_ALL".to_string(), "C".to_string()),
            ]),

            EnvPolicy::Fixed(fixed) => fixed
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),

            EnvPolicy::Inherit(keys) => parent
                .into_iter()
                .filter(|(k, _)| keys.contains(k))
                .collect(),
        };

        result.retain(|k, _| !Self::is_forbidden(k));
        result
    }

    /// Check if a specific key would be removed by ALWAYS_STRIP.
    pub fn is_forbidden(key: &str) -> bool {
        ALWAYS_STRIP.iter().any(|&s| s.eq_ignore_ascii_case(key))
    }
}

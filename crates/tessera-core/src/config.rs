/// Trait for loading configuration from environment variables.
///
/// Implementors derive `serde::Deserialize` and name the env prefix their
/// fields live under; `IDENTITY_` plus field `users_collection` reads
/// `IDENTITY_USERS_COLLECTION`.
pub trait Config: Sized + serde::de::DeserializeOwned {
    /// Env var prefix, including the trailing underscore.
    fn prefix() -> &'static str {
        ""
    }

    /// Load from the process environment, reporting the first bad variable.
    fn try_from_env() -> Result<Self, envy::Error> {
        Self::try_from_iter(std::env::vars())
    }

    /// Load from an explicit set of variables instead of the process environment.
    fn try_from_iter<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix = Self::prefix();
        let vars = vars
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix(prefix).map(|k| (k.to_owned(), v)));
        envy::from_iter(vars)
    }

    /// # Panics
    ///
    /// Panics if any required env var is missing or cannot be deserialized.
    fn from_env() -> Self {
        Self::try_from_env().expect("failed to load config from environment")
    }
}

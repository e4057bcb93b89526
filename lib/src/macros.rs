/// Implements `Display` for a `Serialize` type by pretty-printing it as JSON.
///
/// ```ignore
/// impl_display_using_json_pretty!(Task);
/// ```
#[macro_export]
macro_rules! impl_display_using_json_pretty {
    ($ty:ty) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match serde_json::to_string_pretty(self) {
                    Ok(s) => write!(f, "{s}"),
                    Err(e) => write!(f, "<{}: {e}>", stringify!($ty)),
                }
            }
        }
    };
}

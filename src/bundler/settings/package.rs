//! Package metadata and configuration.

/// Package metadata shared by every platform.
///
/// This maps from the `Cargo.toml` `[package]` section.
///
/// # Examples
///
/// ```
/// use kodegen_bundler_matrix::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     product_name: "akron".into(),
///     binary_name: "akron".into(),
///     description: "Spaces wallet".into(),
///     homepage: Some("https://example.com".into()),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageSettings {
    /// Product name used in bundle names and package names.
    ///
    /// Usually `Cargo.toml` `package.name`.
    pub product_name: String,

    /// Name of the compiled binary (without extension).
    ///
    /// From the first `[[bin]]` entry, falling back to the package name.
    pub binary_name: String,

    /// Brief description of the application.
    ///
    /// Used in package managers and installer descriptions.
    pub description: String,

    /// Homepage URL for the application.
    ///
    /// Default: None
    pub homepage: Option<String>,

    /// List of package authors.
    ///
    /// Format: "Name <email@example.com>"
    ///
    /// Default: None
    pub authors: Option<Vec<String>>,

    /// SPDX license expression.
    ///
    /// Default: None
    pub license: Option<String>,

    /// Source repository URL.
    ///
    /// Used to infer the GitHub repository when publishing.
    ///
    /// Default: None
    pub repository: Option<String>,
}

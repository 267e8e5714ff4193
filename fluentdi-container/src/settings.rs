//! Container settings.
//!
//! Settings derive [`serde::Deserialize`] so they can be read from
//! whatever configuration source the host application uses.

use serde::Deserialize;

/// Options applied by [`ContainerBuilder`](crate::container::ContainerBuilder).
///
/// # Examples
/// ```
/// use fluentdi_container::settings::ContainerSettings;
///
/// let settings = ContainerSettings::default();
/// assert!(!settings.allow_override);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Let a later registration replace an earlier one for the same service
    /// instead of failing the build.
    pub allow_override: bool,
}

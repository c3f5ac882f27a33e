use serde::{Deserialize, Serialize};

/// Postal address shared by workspaces and clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Overlay the fields present in `patch`, keeping the rest.
    pub fn merge(&mut self, patch: Address) {
        if patch.street.is_some() {
            self.street = patch.street;
        }
        if patch.city.is_some() {
            self.city = patch.city;
        }
        if patch.state.is_some() {
            self.state = patch.state;
        }
        if patch.zip_code.is_some() {
            self.zip_code = patch.zip_code;
        }
        if patch.country.is_some() {
            self.country = patch.country;
        }
    }

    /// Non-empty parts joined by ", " in street-to-country order.
    pub fn full_address(&self) -> String {
        [
            &self.street,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

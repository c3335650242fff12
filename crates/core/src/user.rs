//! User accounts and the service-provider profile fields that feed the
//! tradespeople search index.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::geo::{self, GeoPoint};
use crate::roles;
use crate::tier::{self, SubscriptionStatus, Tier};
use crate::types::{DbId, Timestamp};

/// Maximum number of specialties kept on a profile.
pub const MAX_SPECIALTIES: usize = 20;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub business_name: Option<String>,
    pub specialties: Vec<String>,
    pub location_name: Option<String>,
    pub postcode: Option<String>,
    pub city_slug: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub role: String,
    pub name: String,
    pub email: String,
    pub subscription_tier: Tier,
    pub subscription_status: SubscriptionStatus,
    pub profile: UserProfile,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn is_service_provider(&self) -> bool {
        roles::is_service_provider(&self.role)
    }

    pub fn effective_tier(&self) -> Tier {
        tier::effective_tier(self.subscription_tier, self.subscription_status)
    }
}

/// Trim, lower-case and de-duplicate specialties, keeping first-seen order.
///
/// ```
/// use portal_core::user::normalize_specialties;
/// let out = normalize_specialties(&[" Boilers ".into(), "boilers".into(), "".into(), "Drains".into()]);
/// assert_eq!(out, vec!["boilers", "drains"]);
/// ```
pub fn normalize_specialties(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for s in raw {
        let s = s.trim().to_lowercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

/// DTO for `PATCH /api/users/me`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfile {
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub business_name: Option<String>,
    #[validate(length(max = 20, message = "at most 20 specialties"))]
    pub specialties: Option<Vec<String>>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub location_name: Option<String>,
    pub postcode: Option<String>,
}

impl UpdateProfile {
    /// Validate and normalise: specialties cleaned, postcode canonicalised.
    pub fn normalized(&self) -> Result<UpdateProfile, CoreError> {
        self.validate()?;

        let postcode = match self.postcode.as_deref().map(str::trim) {
            Some("") => Some(String::new()),
            Some(pc) if geo::is_full_postcode(pc) => Some(geo::normalize_postcode(pc)),
            Some(_) => {
                return Err(CoreError::invalid_field(
                    "postcode",
                    "must be a valid UK postcode",
                ))
            }
            None => None,
        };

        Ok(UpdateProfile {
            business_name: self.business_name.as_deref().map(|s| s.trim().to_string()),
            specialties: self.specialties.as_deref().map(normalize_specialties),
            location_name: self.location_name.as_deref().map(|s| s.trim().to_string()),
            postcode,
        })
    }

    /// Apply this patch to a profile. Empty strings clear optional fields.
    pub fn apply_to(&self, profile: &mut UserProfile) {
        fn patch(target: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = value {
                *target = if v.is_empty() { None } else { Some(v.clone()) };
            }
        }

        patch(&mut profile.business_name, &self.business_name);
        patch(&mut profile.location_name, &self.location_name);
        if let Some(pc) = &self.postcode {
            if profile.postcode.as_deref() != Some(pc.as_str()) {
                // Stale once the postcode moves; re-geocoded by index sync.
                profile.coordinates = None;
                profile.city_slug = None;
            }
            patch(&mut profile.postcode, &self.postcode);
        }
        if self.location_name.is_some() {
            profile.city_slug = None;
        }
        if let Some(specialties) = &self.specialties {
            profile.specialties = specialties.clone();
        }
    }
}

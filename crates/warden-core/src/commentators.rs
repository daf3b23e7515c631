//! Derives the set of occupants exempt from game-driven muting.

use std::collections::HashSet;

use tracing::warn;

use crate::directory::{Occupant, VoiceDirectory};
use crate::ids::MemberId;

/// Role name granting exemption from game-driven muting.
pub const COMMENTATOR_ROLE: &str = "commentator";

/// Recompute the exempt set from live role data.
///
/// Previous contents are discarded entirely; the result is derived only from
/// the occupants passed in. A failed role lookup excludes that occupant for
/// this pass and never blocks resolution of the others.
pub async fn resolve_commentators(
    directory: &dyn VoiceDirectory,
    occupants: &[Occupant],
) -> HashSet<MemberId> {
    let mut commentators = HashSet::new();
    for occupant in occupants {
        match directory.member_roles(&occupant.id).await {
            Ok(roles) => {
                if roles
                    .iter()
                    .any(|role| role.eq_ignore_ascii_case(COMMENTATOR_ROLE))
                {
                    commentators.insert(occupant.id.clone());
                }
            }
            Err(e) => {
                warn!(
                    member = %occupant.id,
                    error = %e,
                    "role lookup failed; excluding from commentators this pass"
                );
            }
        }
    }
    commentators
}

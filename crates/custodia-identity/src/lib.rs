//! User/Group model and Datatype registry wired into the Key-Access Graph
//! (spec §4.G).

pub mod consent;
pub mod datatype;
pub mod group;
pub mod user;

pub use consent::{consent_key_id, datatype_links, grant_consent, revoke_consent, AccessTypeTag, Consent};
pub use datatype::{ancestors, datatype_key_id, get_datatype, normalize, register_datatype, Datatype};
pub use group::{is_admin, is_member};
pub use user::{
    generate_group_keys, generate_user_keys, grant_group_admin, grant_group_membership,
    seed_user_edges, UserKeys, UserRecord,
};

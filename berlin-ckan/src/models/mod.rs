//! Wire models for the subset of the CKAN Action API v3 used by this crate.
//!
//! Every field CKAN may omit or null out is an `Option`, so partially
//! populated records from older harvests still deserialize.

pub mod action_response;
pub use self::action_response::{ActionError, ActionResponse};
pub mod extra;
pub use self::extra::Extra;
pub mod group;
pub use self::group::Group;
pub mod organization;
pub use self::organization::Organization;
pub mod package;
pub use self::package::Package;
pub mod package_search_result;
pub use self::package_search_result::{FacetItem, PackageSearchResult, SearchFacet};
pub mod resource;
pub use self::resource::Resource;
pub mod tag;
pub use self::tag::Tag;

/*!
Areal interpolation of precinct election results onto ZIP codes.

Precincts and ZIP codes are two independent partitions of a county. This crate
estimates how the votes of each precinct split across ZIP codes, using census tracts
as the intermediate frame:

1. every census tract is reduced to its centroid ([`TractCentroidIndex`]),
2. each centroid is assigned to the ZIP polygon that contains it ([`map_tracts_to_zips`]),
3. the block-to-precinct allocation table gives, for each precinct, its share in
   every tract; these shares become a distribution over ZIP codes ([`build_precinct_weights`]),
4. the votes of each precinct are spread over its ZIP codes with these weights,
   and also added to its city and to the county ([`accumulate_year`]).

Several election years share the same geography and are processed by [`ElectionPipeline`].
See the [`manual`] for the input and output formats.
*/

mod aggregate;
mod config;
mod error;
mod geometry;
mod index;
pub mod manual;
mod mapper;
mod pipeline;
mod weights;

pub use crate::aggregate::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::geometry::*;
pub use crate::index::*;
pub use crate::mapper::*;
pub use crate::pipeline::*;
pub use crate::weights::*;

/*
[INPUT]:  Task state with AAT regions, aircraft position
[OUTPUT]: Target points, region membership, boundary distances, isolines
[POS]:    AAT layer - assigned-area geometry on top of the refreshed task
[UPDATE]: When region shapes or target placement rules change
*/

pub mod isoline;
pub mod region;
pub mod target;

pub use region::{find_inside_distance, find_inside_range, in_aat_region};

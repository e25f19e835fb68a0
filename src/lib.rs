//! Sealed-duration English auction for single NFTs with CCD escrow.
//!
//! A seller deposits a token to open a listing. Bidders escrow increasing
//! amounts of CCD until the deadline. Afterwards the highest bidder claims
//! the token if the reserve was met, or the seller ends the listing and
//! takes the token back; every other bidder withdraws their escrow on their
//! own schedule.
#![cfg_attr(not(feature = "std"), no_std)]

mod contract;
mod errors;
mod events;
mod external;
mod nft;
mod state;

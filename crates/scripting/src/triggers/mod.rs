//! Typed hook call sites
//!
//! One method per host signal, grouped by hook category. Every method is a
//! no-op on a closed engine, and marshals nothing when no script is bound to
//! its key. Boolean hooks return what the host should do when nothing is
//! bound.

mod battleground;
mod creature;
mod gameobject;
mod gossip;
mod group;
mod guild;
mod instance;
mod item;
mod packet;
mod player;
mod server;
mod spell;
mod vehicle;

//! Multi-tree build orchestration.
//!
//! `multitree` coordinates several independently buildable source trees,
//! called inner trees. Each tree exports the API surfaces it contributes;
//! the orchestrator assembles those contributions into stub libraries,
//! combines every tree's build graph into one top-level Ninja file and runs
//! it.
//!
//! The pipeline is driven by [`orchestrator::run_pipeline`], configured by a
//! lunch combo resolved through [`lunch`], and writes build files with
//! [`ninja_writer`].

pub mod api_assembly;
pub mod cli;
pub mod context;
pub mod final_packaging;
pub mod inner_tree;
pub mod lunch;
pub mod ninja_syntax;
pub mod ninja_writer;
pub mod orchestrator;
pub mod process;
pub mod runner;
pub mod status;

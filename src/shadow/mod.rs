pub mod archive;
pub mod artifact;
pub mod clang_support;
pub mod command;
pub mod compile;
pub mod dispatch;
pub mod error;
pub mod fileop;
pub mod link;
pub mod options;
pub mod policy;
pub mod resolver;
pub mod sequencer;

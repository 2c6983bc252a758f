#![warn(clippy::all)]

//! Cross-crate scenarios: compile → evaluate → diff → wire JSON.

#[cfg(test)]
mod support;

#[cfg(test)]
mod component_test;
#[cfg(test)]
mod errors_test;
#[cfg(test)]
mod render_test;
#[cfg(test)]
mod wire_test;

#![cfg(test)]

mod pipeline;
mod resume;
mod support;

//! Marker types.

/// Marker type describing the beginning of a time interval.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing the end of a time interval.
#[derive(Clone, Copy, Debug)]
pub struct End;

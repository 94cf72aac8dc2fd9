pub(crate) mod helpers;

mod tests_round_trip;

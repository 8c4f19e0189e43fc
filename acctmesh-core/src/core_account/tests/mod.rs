/*
    Tests for the core_account subsystem

    Test suite covering:
    - Field merge laws (idempotence, order independence, round trip)
    - Store scenarios (creation conflicts, removal, aliases, notifications)
    - Convergence of independent stores exchanging peer messages
*/

pub mod helpers;

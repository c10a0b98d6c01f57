// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod fixtures;
pub mod command_tests;
pub mod proof_tests;
pub mod verify_tests;

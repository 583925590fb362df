// Entity Models - teams and the cars they enter

pub mod car;
pub mod team;

pub use car::{AttributeRange, Car, NewCar, Performance};
pub use team::{NewTeam, Team};

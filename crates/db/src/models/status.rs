//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up the variant for a database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Booking session lifecycle status.
    BookingStatus {
        Scheduled = 1,
        Confirmed = 2,
        Completed = 3,
        Cancelled = 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerwell_core::booking;

    #[test]
    fn booking_status_ids_match_seed_data() {
        assert_eq!(BookingStatus::Scheduled.id(), 1);
        assert_eq!(BookingStatus::Confirmed.id(), 2);
        assert_eq!(BookingStatus::Completed.id(), 3);
        assert_eq!(BookingStatus::Cancelled.id(), 4);
    }

    #[test]
    fn booking_status_ids_match_core_constants() {
        assert_eq!(BookingStatus::Scheduled.id(), booking::STATUS_SCHEDULED);
        assert_eq!(BookingStatus::Confirmed.id(), booking::STATUS_CONFIRMED);
        assert_eq!(BookingStatus::Completed.id(), booking::STATUS_COMPLETED);
        assert_eq!(BookingStatus::Cancelled.id(), booking::STATUS_CANCELLED);
    }

    #[test]
    fn from_id_rejects_unknown() {
        assert_eq!(BookingStatus::from_id(3), Some(BookingStatus::Completed));
        assert_eq!(BookingStatus::from_id(9), None);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = BookingStatus::Confirmed.into();
        assert_eq!(id, 2);
    }
}

use serde::{Deserialize, Serialize};

// ========== PERIOD ==========
/// A shift slot within a day. Wire values are fixed; the table keys embed them.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Morning,
    Afternoon,
    Night,
    FullDay,
}

impl Period {
    pub const ALL: [Period; 4] = [
        Period::Morning,
        Period::Afternoon,
        Period::Night,
        Period::FullDay,
    ];

    /// Periods a doctor can announce availability for. A full-day announcement
    /// does not exist; screens derive it from morning+afternoon+night.
    pub const ANNOUNCEABLE: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
            Period::Night => "night",
            Period::FullDay => "full_day",
        }
    }

    pub fn parse(s: &str) -> Option<Period> {
        match s {
            "morning" => Some(Period::Morning),
            "afternoon" => Some(Period::Afternoon),
            "night" => Some(Period::Night),
            "full_day" => Some(Period::FullDay),
            _ => None,
        }
    }

    /// Maximum doctors assignable to this period on a single day.
    pub fn capacity(&self) -> usize {
        match self {
            Period::Morning | Period::Afternoon | Period::FullDay => 6,
            Period::Night => 3,
        }
    }
}

// ========== ROLE ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Coordinator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Coordinator => "coordinator",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "coordinator" => Some(Role::Coordinator),
            _ => None,
        }
    }

    /// Roster management and swap decisions.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Calendar editing is shared with coordinators.
    pub fn can_edit_schedule(&self) -> bool {
        matches!(self, Role::Admin | Role::Coordinator)
    }
}

// ========== SWAP STATUS ==========
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl SwapStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
            SwapStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<SwapStatus> {
        match s {
            "pending" => Some(SwapStatus::Pending),
            "approved" => Some(SwapStatus::Approved),
            "rejected" => Some(SwapStatus::Rejected),
            "cancelled" => Some(SwapStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal requests admit no further transition of any kind.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SwapStatus::Pending)
    }
}

// ========== USER ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
    pub last_login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
}

// ========== MEMBERSHIP ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Membership {
    pub hospital_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: String,
}

/// Roster row: membership joined with the member's profile.
#[derive(Debug, Serialize, Clone)]
pub struct RosterEntry {
    pub hospital_id: String,
    pub user_id: String,
    pub role: Role,
    pub joined_at: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct AddDoctorRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

// ========== SHIFT ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shift {
    pub hospital_id: String,
    pub date: String,
    pub period: Period,
    pub doctor_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShiftAssignment {
    pub period: Period,
    pub doctor_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceDayRequest {
    pub shifts: Vec<ShiftAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct CopyDayRequest {
    pub target_date: String,
}

#[derive(Debug, Deserialize)]
pub struct CopyMonthRequest {
    pub source_month: String,
    pub target_month: String,
}

// ========== AVAILABILITY ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Availability {
    pub hospital_id: String,
    pub user_id: String,
    pub date: String,
    pub period: Period,
}

#[derive(Debug, Deserialize)]
pub struct SetAvailabilityRequest {
    pub periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAvailabilityRequest {
    pub dates: Vec<String>,
    pub periods: Vec<Period>,
}

// ========== SWAP REQUEST ==========
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SwapRequest {
    pub request_id: String,
    pub hospital_id: String,
    pub requester_user_id: String,
    pub shift_date: String,
    pub shift_period: Period,
    pub target_user_id: Option<String>,
    pub reason: Option<String>,
    pub status: SwapStatus,
    pub created_at: String,
    pub handled_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSwapRequest {
    pub shift_date: String,
    pub shift_period: Period,
    pub target_user_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApproveSwapRequest {
    /// Final target override; required when the request is still open.
    pub target_user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_wire_values_round_trip() {
        for p in Period::ALL {
            assert_eq!(Period::parse(p.as_str()), Some(p));
        }
        assert_eq!(Period::parse("24h"), None);
        assert_eq!(Period::FullDay.as_str(), "full_day");
    }

    #[test]
    fn test_period_serde_matches_as_str() {
        for p in Period::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
            let back: Period = serde_json::from_str(&json).unwrap();
            assert_eq!(back, p);
        }
    }

    #[test]
    fn test_period_capacities() {
        assert_eq!(Period::Morning.capacity(), 6);
        assert_eq!(Period::Afternoon.capacity(), 6);
        assert_eq!(Period::Night.capacity(), 3);
        assert_eq!(Period::FullDay.capacity(), 6);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Coordinator.is_admin());
        assert!(!Role::Doctor.is_admin());
        assert!(Role::Admin.can_edit_schedule());
        assert!(Role::Coordinator.can_edit_schedule());
        assert!(!Role::Doctor.can_edit_schedule());
    }

    #[test]
    fn test_swap_status_terminality() {
        assert!(!SwapStatus::Pending.is_terminal());
        assert!(SwapStatus::Approved.is_terminal());
        assert!(SwapStatus::Rejected.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
    }
}

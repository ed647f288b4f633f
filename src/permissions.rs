//! Connection permission graph.
//!
//! Directed edges between accounts (owner -> grantee) carry a capability
//! set and a lifecycle state; access checks run a default-deny cascade:
//! 1. Own data -> ALLOW
//! 2. Doctor with an accepted doctor connection -> ALLOW (per capability)
//! 3. Active edge with the capability granted and not expired -> ALLOW
//! 4. Default -> DENY
//!
//! Unidirectional: Alice granting Bob says nothing about Bob granting Alice.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{account, connection};
use crate::error::CareError;
use crate::models::{
    Capability, CapabilitySet, ConnectionEdge, ConnectionStatus, Role,
};

/// Why access was granted (or denied), kept for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Actor accessing their own data.
    OwnData,
    /// Doctor holding an accepted doctor connection with the capability.
    DoctorConnection,
    /// Active connection edge with the capability granted.
    ExplicitGrant,
    /// No matching rule; access denied.
    Denied,
}

/// Result of an authorization check.
#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny() -> Self {
        Self { allowed: false, reason: AccessReason::Denied }
    }
}

/// Can `actor` exercise `capability` over `owner`'s data as of `now`?
pub fn check_access(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    capability: Capability,
    now: NaiveDateTime,
) -> Result<AccessDecision, CareError> {
    // Rule 1: Own data
    if actor_id == owner_id {
        return Ok(AccessDecision::allow(AccessReason::OwnData));
    }

    let edge = connection::find_active_edge(conn, owner_id, actor_id)?;
    let edge = match edge {
        Some(edge) if edge.is_active_at(now) => edge,
        _ => return Ok(AccessDecision::deny()),
    };

    if !edge.capabilities.grants(capability) {
        return Ok(AccessDecision::deny());
    }

    // Rule 2: Doctor via accepted doctor connection. Doctors get no blanket
    // access; the accepted edge and its capability flags are authoritative.
    if edge.grantee_role == Role::Doctor {
        if let Some(actor) = account::get_account(conn, actor_id)? {
            if actor.role == Role::Doctor {
                return Ok(AccessDecision::allow(AccessReason::DoctorConnection));
            }
        }
    }

    // Rule 3: Explicit grant
    Ok(AccessDecision::allow(AccessReason::ExplicitGrant))
}

/// Shortcut that turns a denial into `CareError::Unauthorized`.
pub fn require_access(
    conn: &Connection,
    actor_id: &Uuid,
    owner_id: &Uuid,
    capability: Capability,
    now: NaiveDateTime,
) -> Result<(), CareError> {
    let decision = check_access(conn, actor_id, owner_id, capability, now)?;
    if decision.allowed {
        Ok(())
    } else {
        Err(CareError::Unauthorized(format!(
            "{} on account {owner_id} denied",
            capability.as_str()
        )))
    }
}

// ═══════════════════════════════════════════════════════════
// Connection lifecycle
// ═══════════════════════════════════════════════════════════

/// Propose a connection: the requester asks `target` (account id or email)
/// to share data. Creates a single pending edge owned by the target;
/// "requests I sent" is the query over edges where I am the grantee.
pub fn request_connection(
    conn: &Connection,
    requester_id: &Uuid,
    target: &str,
    requester_role: Role,
    relationship: &str,
    now: NaiveDateTime,
) -> Result<ConnectionEdge, CareError> {
    let requester = account::get_account(conn, requester_id)?
        .ok_or_else(|| CareError::not_found("Account", requester_id))?;

    let owner = match Uuid::parse_str(target) {
        Ok(id) => account::get_account(conn, &id)?,
        Err(_) => account::get_account_by_email(conn, target)?,
    }
    .ok_or_else(|| CareError::not_found("Account", target))?;

    if owner.id == *requester_id {
        return Err(CareError::Validation(
            "Cannot request a connection to yourself".into(),
        ));
    }

    if connection::find_open_edge(conn, &owner.id, requester_id, &requester.email)?.is_some() {
        return Err(CareError::Conflict(format!(
            "A pending or active connection to {} already exists",
            owner.email
        )));
    }

    let edge = ConnectionEdge {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        grantee_id: Some(*requester_id),
        grantee_email: requester.email,
        grantee_role: requester_role,
        relationship: relationship.to_string(),
        status: ConnectionStatus::Pending,
        capabilities: CapabilitySet::default(),
        created_at: now,
        accepted_at: None,
        expires_at: None,
    };
    connection::insert_edge(conn, &edge)?;

    tracing::info!(edge = %edge.id, owner = %owner.id, grantee = %requester_id, "Connection requested");
    Ok(edge)
}

/// Accept or decline a pending connection. Only the data owner may respond;
/// declined is terminal and the row is kept for audit.
pub fn respond_to_connection(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
    accept: bool,
    now: NaiveDateTime,
) -> Result<ConnectionEdge, CareError> {
    let edge = connection::get_edge(conn, edge_id)?
        .ok_or_else(|| CareError::not_found("Connection", edge_id))?;

    if edge.owner_id != *owner_id {
        return Err(CareError::Unauthorized(
            "Only the data owner may respond to a connection request".into(),
        ));
    }
    if edge.status != ConnectionStatus::Pending {
        return Err(CareError::Conflict(format!(
            "Connection already processed: status is {}",
            edge.status.as_str()
        )));
    }

    let (status, accepted_at) = if accept {
        (ConnectionStatus::Active, Some(now))
    } else {
        (ConnectionStatus::Declined, None)
    };
    connection::update_edge_status(conn, edge_id, status, accepted_at)?;

    tracing::info!(edge = %edge_id, accepted = accept, "Connection request answered");
    connection::get_edge(conn, edge_id)?
        .ok_or_else(|| CareError::not_found("Connection", edge_id))
}

/// Narrow or widen the capability set. Owner-only: the grantee can never
/// change what was granted to them.
pub fn update_capabilities(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
    capabilities: CapabilitySet,
) -> Result<ConnectionEdge, CareError> {
    let edge = connection::get_edge(conn, edge_id)?
        .ok_or_else(|| CareError::not_found("Connection", edge_id))?;

    if edge.owner_id != *owner_id {
        return Err(CareError::Unauthorized(
            "Only the data owner may change connection capabilities".into(),
        ));
    }
    if edge.status != ConnectionStatus::Active {
        return Err(CareError::InvalidState(format!(
            "Cannot change capabilities of a {} connection",
            edge.status.as_str()
        )));
    }

    connection::update_edge_capabilities(conn, edge_id, &capabilities)?;
    connection::get_edge(conn, edge_id)?
        .ok_or_else(|| CareError::not_found("Connection", edge_id))
}

/// Revoke a grant: soft-close the edge to inactive. The reverse-direction
/// edge, if one exists, is an independent grant and is left untouched.
pub fn revoke_connection(
    conn: &Connection,
    owner_id: &Uuid,
    edge_id: &Uuid,
) -> Result<(), CareError> {
    let edge = connection::get_edge(conn, edge_id)?
        .ok_or_else(|| CareError::not_found("Connection", edge_id))?;

    if edge.owner_id != *owner_id {
        return Err(CareError::Unauthorized(
            "Only the data owner may revoke a connection".into(),
        ));
    }
    if matches!(edge.status, ConnectionStatus::Declined | ConnectionStatus::Inactive) {
        return Err(CareError::InvalidState(format!(
            "Connection is already {}",
            edge.status.as_str()
        )));
    }

    connection::update_edge_status(conn, edge_id, ConnectionStatus::Inactive, None)?;
    tracing::info!(edge = %edge_id, "Connection revoked");
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

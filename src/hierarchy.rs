use std::collections::{HashMap, HashSet, VecDeque};

use crate::db;
use crate::error::{Error, Kind, Result};
use crate::types::Id;
use crate::user::{self, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Supervisors looking down at their reports
	Downward,
	/// Leads and agents looking up their chain of command
	Upward,
}

/// A user reached by a hierarchy walk, annotated with its distance
/// from the requester
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
	pub user: User,
	pub depth: u32,
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
	pub requester: User,
	pub direction: Direction,
	pub members: Vec<Member>,
}

impl Hierarchy {
	/// Everyone in the resolved set, requester included. Listings for
	/// non-admin roles are scoped to records touching these ids.
	pub fn user_ids(&self) -> Vec<Id> {
		let mut ids: Vec<Id> = self.members.iter().map(|m| m.user.id).collect();
		ids.push(self.requester.id);
		ids
	}
}

/// Resolves the supervisor graph around a user, in the direction their
/// role implies
pub struct Service<'a> {
	user_repo: &'a user::Repo,
}

impl<'a> Service<'a> {
	pub fn new(user_repo: &'a user::Repo) -> Self {
		Service { user_repo }
	}

	pub fn resolve(&self, user_id: &Id) -> Result<Hierarchy> {
		let requester = self.require_active(user_id)?;
		let roster = self.user_repo.list_active()?;

		let (direction, members) = match requester.role {
			Role::SuperAdmin => (Direction::Downward, walk_down(&roster, &requester.id, None)),
			Role::Admin => (Direction::Downward, walk_down(&roster, &requester.id, Some(1))),
			Role::Lead | Role::Agent => (Direction::Upward, walk_up(&roster, &requester.id)),
		};

		Ok(Hierarchy { requester, direction, members })
	}

	/// The users a requester may assign to a loan as agents, per role:
	/// super admins see every lead and agent, admins their leads plus those
	/// leads' agents, leads their own agents, agents only themselves.
	pub fn leads_and_agents(&self, user_id: &Id) -> Result<Vec<User>> {
		let requester = self.require_active(user_id)?;
		let roster = self.user_repo.list_active()?;
		Ok(assignable_agents(&requester, roster))
	}

	fn require_active(&self, user_id: &Id) -> Result<User> {
		let user = match self.user_repo.find_by_id(user_id) {
			Ok(user) => user,
			Err(db::Error::RecordNotFound) => return Err(Error::new(Kind::UserNotFound(*user_id))),
			Err(e) => return Err(e.into()),
		};
		if user.deleted {
			return Err(Error::new(Kind::UserNotFound(*user_id)));
		}
		if !user.status {
			return Err(Error::new(Kind::UserInactive(*user_id)));
		}
		Ok(user)
	}
}

/// The roster slice a requester may assign as loan agents, ordered
/// leads ahead of agents, then by name
fn assignable_agents(requester: &User, roster: Vec<User>) -> Vec<User> {
	let mut users: Vec<User> = match requester.role {
		Role::SuperAdmin => roster
			.into_iter()
			.filter(|u| u.role == Role::Lead || u.role == Role::Agent)
			.collect(),
		Role::Admin => {
			let leads: Vec<User> = roster
				.iter()
				.filter(|u| u.role == Role::Lead && u.supervisor == Some(requester.id))
				.cloned()
				.collect();
			let lead_ids: HashSet<Id> = leads.iter().map(|l| l.id).collect();
			let agents = roster.iter().filter(|u| {
				u.role == Role::Agent
					&& u.supervisor.map_or(false, |s| lead_ids.contains(&s))
			});
			leads.iter().cloned().chain(agents.cloned()).collect()
		}
		Role::Lead => roster
			.into_iter()
			.filter(|u| u.role == Role::Agent && u.supervisor == Some(requester.id))
			.collect(),
		Role::Agent => vec![requester.clone()],
	};

	users.sort_by(|a, b| {
		let rank = |u: &User| if u.role == Role::Lead { 0 } else { 1 };
		rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
	});
	users
}

/// Breadth-first walk over the supervisee edges. The visited set guards
/// against cycles the data model is not supposed to contain.
fn walk_down(roster: &[User], root: &Id, max_depth: Option<u32>) -> Vec<Member> {
	let mut children: HashMap<Id, Vec<&User>> = HashMap::new();
	for user in roster {
		if let Some(supervisor) = user.supervisor {
			children.entry(supervisor).or_default().push(user);
		}
	}

	let mut members = Vec::new();
	let mut visited: HashSet<Id> = HashSet::new();
	let mut frontier: VecDeque<(Id, u32)> = VecDeque::new();

	visited.insert(*root);
	frontier.push_back((*root, 0));

	while let Some((current, depth)) = frontier.pop_front() {
		if max_depth.map_or(false, |max| depth >= max) {
			continue;
		}
		if let Some(reports) = children.get(&current) {
			for report in reports {
				if !visited.insert(report.id) {
					continue;
				}
				members.push(Member { user: (*report).clone(), depth: depth + 1 });
				frontier.push_back((report.id, depth + 1));
			}
		}
	}

	members
}

/// Follow the supervisor references up to the root, stopping on a missing
/// or already-seen supervisor.
fn walk_up(roster: &[User], start: &Id) -> Vec<Member> {
	let by_id: HashMap<Id, &User> = roster.iter().map(|u| (u.id, u)).collect();

	let mut members = Vec::new();
	let mut visited: HashSet<Id> = HashSet::new();
	visited.insert(*start);

	let mut current = match by_id.get(start) {
		Some(user) => *user,
		None => return members,
	};
	let mut depth = 0;

	while let Some(supervisor_id) = current.supervisor {
		if !visited.insert(supervisor_id) {
			break;
		}
		let supervisor = match by_id.get(&supervisor_id) {
			Some(user) => *user,
			None => break,
		};
		depth += 1;
		members.push(Member { user: supervisor.clone(), depth });
		current = supervisor;
	}

	members
}

#[cfg(test)]
mod tests {
	use crate::testutil::{user_with_id, RosterIds};

	use super::*;

	fn depths_by_id(members: &[Member]) -> HashMap<Id, u32> {
		members.iter().map(|m| (m.user.id, m.depth)).collect()
	}

	// sa(1) <- admin(2) <- lead(3) <- agent(4), agent(5)
	fn chain() -> (Vec<User>, RosterIds) {
		let ids = RosterIds::default();
		let roster = vec![
			user_with_id(ids.sa, Role::SuperAdmin, None),
			user_with_id(ids.admin, Role::Admin, Some(ids.sa)),
			user_with_id(ids.lead, Role::Lead, Some(ids.admin)),
			user_with_id(ids.agent_1, Role::Agent, Some(ids.lead)),
			user_with_id(ids.agent_2, Role::Agent, Some(ids.lead)),
		];
		(roster, ids)
	}

	#[test]
	fn downward_walk_reaches_every_subordinate_once() {
		let (roster, ids) = chain();

		let members = walk_down(&roster, &ids.sa, None);
		assert_eq!(members.len(), 4);

		let depths = depths_by_id(&members);
		assert_eq!(depths[&ids.admin], 1);
		assert_eq!(depths[&ids.lead], 2);
		assert_eq!(depths[&ids.agent_1], 3);
		assert_eq!(depths[&ids.agent_2], 3);
	}

	#[test]
	fn downward_walk_with_depth_limit_takes_direct_reports_only() {
		let (roster, ids) = chain();

		let members = walk_down(&roster, &ids.admin, Some(1));
		assert_eq!(members.len(), 1);
		assert_eq!(members[0].user.id, ids.lead);
		assert_eq!(members[0].depth, 1);
	}

	#[test]
	fn downward_walk_terminates_on_injected_cycle() {
		let ids = RosterIds::default();
		// sa supervises lead, lead supervises agent, and the cycle points
		// sa's own supervisor edge back down at the agent
		let roster = vec![
			user_with_id(ids.sa, Role::SuperAdmin, Some(ids.agent_1)),
			user_with_id(ids.lead, Role::Lead, Some(ids.sa)),
			user_with_id(ids.agent_1, Role::Agent, Some(ids.lead)),
		];

		let members = walk_down(&roster, &ids.sa, None);
		let depths = depths_by_id(&members);

		assert_eq!(members.len(), 2, "each subordinate appears exactly once");
		assert_eq!(depths[&ids.lead], 1);
		assert_eq!(depths[&ids.agent_1], 2);
	}

	#[test]
	fn upward_walk_returns_chain_in_depth_order() {
		let (roster, ids) = chain();

		let members = walk_up(&roster, &ids.agent_1);
		let got: Vec<(Id, u32)> = members.iter().map(|m| (m.user.id, m.depth)).collect();
		assert_eq!(got, vec![(ids.lead, 1), (ids.admin, 2), (ids.sa, 3)]);
	}

	// chain() plus a second lead under its own admin, with one agent
	fn two_branch_roster() -> (Vec<User>, RosterIds, Id, Id) {
		let (mut roster, ids) = chain();
		let other_lead = Id::from_u128(6);
		let other_agent = Id::from_u128(7);
		roster.push(user_with_id(other_lead, Role::Lead, Some(ids.sa)));
		roster.push(user_with_id(other_agent, Role::Agent, Some(other_lead)));
		(roster, ids, other_lead, other_agent)
	}

	fn ids_of(users: &[User]) -> Vec<Id> {
		users.iter().map(|u| u.id).collect()
	}

	#[test]
	fn super_admin_may_assign_every_lead_and_agent() {
		let (roster, ids, other_lead, other_agent) = two_branch_roster();
		let requester = user_with_id(ids.sa, Role::SuperAdmin, None);

		let got = assignable_agents(&requester, roster);
		// leads ahead of agents, each group ordered by name
		assert_eq!(
			ids_of(&got),
			vec![ids.lead, other_lead, ids.agent_1, ids.agent_2, other_agent],
		);
	}

	#[test]
	fn admin_may_assign_own_leads_and_their_agents_only() {
		let (roster, ids, _, _) = two_branch_roster();
		let requester = user_with_id(ids.admin, Role::Admin, Some(ids.sa));

		let got = assignable_agents(&requester, roster);
		// the other branch's lead reports to the super admin, not this
		// admin, so neither it nor its agent appears
		assert_eq!(ids_of(&got), vec![ids.lead, ids.agent_1, ids.agent_2]);
	}

	#[test]
	fn lead_may_assign_own_agents_only() {
		let (roster, ids, _, other_agent) = two_branch_roster();
		let requester = user_with_id(ids.lead, Role::Lead, Some(ids.admin));

		let got = assignable_agents(&requester, roster);
		assert_eq!(ids_of(&got), vec![ids.agent_1, ids.agent_2]);
		assert!(!ids_of(&got).contains(&other_agent));
	}

	#[test]
	fn agent_may_assign_only_themselves() {
		let (roster, ids, _, _) = two_branch_roster();
		let requester = user_with_id(ids.agent_1, Role::Agent, Some(ids.lead));

		let got = assignable_agents(&requester, roster);
		assert_eq!(ids_of(&got), vec![ids.agent_1]);
	}

	#[test]
	fn upward_walk_terminates_on_injected_cycle() {
		let ids = RosterIds::default();
		let roster = vec![
			user_with_id(ids.sa, Role::SuperAdmin, Some(ids.agent_1)),
			user_with_id(ids.lead, Role::Lead, Some(ids.sa)),
			user_with_id(ids.agent_1, Role::Agent, Some(ids.lead)),
		];

		let members = walk_up(&roster, &ids.agent_1);
		let got: Vec<Id> = members.iter().map(|m| m.user.id).collect();
		assert_eq!(got, vec![ids.lead, ids.sa]);
	}
}

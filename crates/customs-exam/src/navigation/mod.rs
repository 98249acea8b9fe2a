//! Role-scoped navigation: which home route each staff role lands on and the
//! exact set of links it may follow. The table is built once per process and
//! never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Supervisor,
    Ejecutivo,
    Facturacion,
    Examinador,
}

impl Role {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Admin,
            Self::Supervisor,
            Self::Ejecutivo,
            Self::Facturacion,
            Self::Examinador,
        ]
    }

    const fn index(self) -> usize {
        match self {
            Self::Admin => 0,
            Self::Supervisor => 1,
            Self::Ejecutivo => 2,
            Self::Facturacion => 3,
            Self::Examinador => 4,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Supervisor => "supervisor",
            Self::Ejecutivo => "ejecutivo",
            Self::Facturacion => "facturacion",
            Self::Examinador => "examinador",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Administrador",
            Self::Supervisor => "Supervisor",
            Self::Ejecutivo => "Ejecutivo",
            Self::Facturacion => "Facturación",
            Self::Examinador => "Examinador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub route: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleNavigation {
    pub role: Role,
    pub home_route: &'static str,
    pub links: Vec<NavLink>,
}

const fn link(label: &'static str, route: &'static str) -> NavLink {
    NavLink { label, route }
}

const ADMIN_LINKS: [NavLink; 6] = [
    link("Dashboard", "/admin/dashboard"),
    link("Examen Previo", "/examen-previo"),
    link("Aforos", "/aforos"),
    link("Facturación", "/facturacion"),
    link("Reportes", "/reportes"),
    link("Usuarios", "/usuarios"),
];

const SUPERVISOR_LINKS: [NavLink; 4] = [
    link("Dashboard", "/supervisor/dashboard"),
    link("Examen Previo", "/examen-previo"),
    link("Aforos", "/aforos"),
    link("Reportes", "/reportes"),
];

const EJECUTIVO_LINKS: [NavLink; 3] = [
    link("Dashboard", "/ejecutivo/dashboard"),
    link("Aforos", "/aforos"),
    link("Examen Previo", "/examen-previo"),
];

const FACTURACION_LINKS: [NavLink; 3] = [
    link("Dashboard", "/facturacion/dashboard"),
    link("Facturación", "/facturacion"),
    link("Reportes", "/reportes"),
];

const EXAMINADOR_LINKS: [NavLink; 2] = [
    link("Examen Previo", "/examen-previo"),
    link("Historial", "/examen-previo/historial"),
];

fn entry(role: Role, home_route: &'static str, links: &[NavLink]) -> RoleNavigation {
    RoleNavigation {
        role,
        home_route,
        links: links.to_vec(),
    }
}

#[derive(Debug)]
pub struct NavigationTable {
    entries: [RoleNavigation; 5],
}

impl NavigationTable {
    fn standard() -> Self {
        // Order matches `Role::index`.
        Self {
            entries: [
                entry(Role::Admin, "/admin/dashboard", &ADMIN_LINKS),
                entry(Role::Supervisor, "/supervisor/dashboard", &SUPERVISOR_LINKS),
                entry(Role::Ejecutivo, "/ejecutivo/dashboard", &EJECUTIVO_LINKS),
                entry(Role::Facturacion, "/facturacion/dashboard", &FACTURACION_LINKS),
                entry(Role::Examinador, "/examen-previo", &EXAMINADOR_LINKS),
            ],
        }
    }

    pub fn global() -> &'static NavigationTable {
        static TABLE: OnceLock<NavigationTable> = OnceLock::new();
        TABLE.get_or_init(Self::standard)
    }

    pub fn for_role(&self, role: Role) -> &RoleNavigation {
        &self.entries[role.index()]
    }

    pub fn home_route(&self, role: Role) -> &'static str {
        self.for_role(role).home_route
    }

    pub fn allows(&self, role: Role, route: &str) -> bool {
        self.for_role(role)
            .links
            .iter()
            .any(|link| link.route == route)
    }

    pub fn roles(&self) -> Vec<&RoleNavigation> {
        Role::ordered()
            .into_iter()
            .map(|role| self.for_role(role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_role_has_an_entry_whose_home_is_a_permitted_link() {
        let table = NavigationTable::global();
        for role in Role::ordered() {
            let home = table.home_route(role);
            assert!(table.allows(role, home), "{role} home {home} not in links");
        }
    }

    #[test]
    fn billing_cannot_reach_exam_screens() {
        let table = NavigationTable::global();
        assert!(!table.allows(Role::Facturacion, "/examen-previo"));
        assert!(table.allows(Role::Facturacion, "/facturacion"));
    }

    #[test]
    fn examiner_links_are_exactly_enumerated() {
        let routes: Vec<&str> = NavigationTable::global()
            .for_role(Role::Examinador)
            .links
            .iter()
            .map(|link| link.route)
            .collect();
        assert_eq!(routes, vec!["/examen-previo", "/examen-previo/historial"]);
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(
            "auditor".parse::<Role>(),
            Err(UnknownRole("auditor".to_string()))
        );
    }
}

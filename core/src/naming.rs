//! Derived action and mutation names

/// Name under which an action is dispatched (the action name itself)
#[must_use]
pub fn dispatch_name(action: &str) -> String {
    action.to_string()
}

/// Mutation name for an action: camel case to upper snake case
///
/// An underscore is inserted before every ASCII capital, then the whole
/// string is upper-cased.
///
/// ```
/// use rest_store_core::naming::commit_name;
///
/// assert_eq!(commit_name("fetchUserList"), "FETCH_USER_LIST");
/// ```
#[must_use]
pub fn commit_name(action: &str) -> String {
    let mut name = String::with_capacity(action.len() + 4);
    for ch in action.chars() {
        if ch.is_ascii_uppercase() {
            name.push('_');
        }
        name.extend(ch.to_uppercase());
    }
    name
}

/// Mutation name with a suffix appended (`NAME_SUFFIX`)
#[must_use]
pub fn suffixed(commit_name: &str, suffix: &str) -> String {
    format!("{commit_name}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn converts_camel_case() {
        assert_eq!(commit_name("fetchUser"), "FETCH_USER");
        assert_eq!(commit_name("list"), "LIST");
        assert_eq!(commit_name("getURL"), "GET_U_R_L");
    }

    #[test]
    fn leading_capital_gets_leading_underscore() {
        assert_eq!(commit_name("Reset"), "_RESET");
    }

    #[test]
    fn suffix_is_joined_with_underscore() {
        assert_eq!(suffixed("FETCH_USER", "SUCCEEDED"), "FETCH_USER_SUCCEEDED");
    }

    proptest! {
        #[test]
        fn commit_name_is_upper_case(action in "[a-z][a-zA-Z0-9]{0,16}") {
            let name = commit_name(&action);
            prop_assert_eq!(name.clone(), name.to_uppercase());
            let capitals = action.chars().filter(char::is_ascii_uppercase).count();
            prop_assert_eq!(name.len(), action.len() + capitals);
        }
    }
}

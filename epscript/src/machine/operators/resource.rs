use super::{built_in_ops, text::find_font};
use crate::{dictionary::EpsDictionary, machine::Machine, MachineResult, Name};

fn pop_category(m: &mut Machine) -> MachineResult<Name> {
    m.pop()?.name_value()
}

pub(super) fn register(d: &mut EpsDictionary, level: u8) {
    if level < 2 {
        return;
    }
    built_in_ops!(d;
        // key category findresource -> instance
        "findresource" => |m| {
            let category = pop_category(m)?;
            let key = m.pop()?;
            let found = m.resources.borrow().try_find(&category, &key).cloned();
            let v = match found {
                Some(v) => v,
                None if category.as_str() == "Font" => find_font(m, &key),
                None => m.resources.borrow().find(&category, &key)?.clone(),
            };
            m.push(v);
            Ok(())
        },
        // key instance category defineresource -> instance
        "defineresource" => |m| {
            let category = pop_category(m)?;
            let instance = m.pop()?;
            let key = m.pop()?;
            if category.as_str() == "Font" {
                m.dicts.font.borrow_mut().add(key.clone(), instance.clone());
            }
            m.resources.borrow_mut().define(category, key, instance.clone());
            m.push(instance);
            Ok(())
        },
        // key category undefineresource -
        "undefineresource" => |m| {
            let category = pop_category(m)?;
            let key = m.pop()?;
            m.resources.borrow_mut().undefine(&category, &key);
            Ok(())
        },
        // key category resourcestatus -> status size true | false
        "resourcestatus" => |m| {
            let category = pop_category(m)?;
            let key = m.pop()?;
            let found = m.resources.borrow().try_find(&category, &key).is_some();
            if found {
                m.push(1);
                m.push(-1);
            }
            m.push(found);
            Ok(())
        },
        // template proc scratch category resourceforall -
        "resourceforall" => |m| {
            let category = pop_category(m)?;
            m.pop()?;
            let proc = m.pop()?;
            let template = m.pop()?;
            let resources = m.resources.borrow().get_filtered_resources(&category, &template);
            for (key, _) in resources {
                m.push(key);
                m.execute_object(proc.clone())?;
                if m.break_current_loop() {
                    break;
                }
            }
            m.end_loop();
            Ok(())
        },
    );
}

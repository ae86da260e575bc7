//! Virtual lights and the floor → room hierarchy holding them.

use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualLight {
    pub act_id: u32,
    pub name: String,
    pub on: bool,
}

impl VirtualLight {
    #[must_use]
    pub fn new(act_id: u32, name: impl Into<String>, on: bool) -> Self {
        Self {
            act_id,
            name: name.into(),
            on,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub room_ind: u32,
    pub name: String,
    pub lights: Vec<VirtualLight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Floor {
    pub floor_ind: u32,
    pub name: String,
    pub rooms: Vec<Room>,
}

impl Floor {
    #[must_use]
    pub fn new(floor_ind: u32, name: impl Into<String>) -> Self {
        Self {
            floor_ind,
            name: name.into(),
            rooms: Vec::new(),
        }
    }

    /// The room with `room_ind`, created empty if absent.
    pub fn room_mut(&mut self, room_ind: u32, name: &str) -> &mut Room {
        let position = match self.rooms.iter().position(|r| r.room_ind == room_ind) {
            Some(position) => position,
            None => {
                self.rooms.push(Room {
                    room_ind,
                    name: name.to_string(),
                    lights: Vec::new(),
                });
                self.rooms.len() - 1
            }
        };
        &mut self.rooms[position]
    }

    pub fn lights_mut(&mut self) -> impl Iterator<Item = &mut VirtualLight> {
        self.rooms.iter_mut().flat_map(|room| room.lights.iter_mut())
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let rooms: Vec<Value> = self
            .rooms
            .iter()
            .map(|room| {
                let lights: Vec<Value> = room
                    .lights
                    .iter()
                    .map(|light| {
                        json!({
                            "act_id": light.act_id,
                            "name": light.name,
                            "status": u8::from(light.on),
                            "floor_ind": self.floor_ind,
                            "room_ind": room.room_ind,
                        })
                    })
                    .collect();
                json!({ "room_ind": room.room_ind, "name": room.name, "array": lights })
            })
            .collect();
        json!({ "floor_ind": self.floor_ind, "name": self.name, "array": rooms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_nest_lights_under_rooms() {
        let mut floor = Floor::new(0, "Ground");
        floor
            .room_mut(1, "Kitchen")
            .lights
            .push(VirtualLight::new(4, "Ceiling", true));
        floor
            .room_mut(1, "Kitchen")
            .lights
            .push(VirtualLight::new(5, "Island", false));

        let json = floor.to_json();

        assert_eq!(floor.rooms.len(), 1);
        assert_eq!(json["array"][0]["name"], "Kitchen");
        assert_eq!(json["array"][0]["array"][1]["act_id"], 5);
        assert_eq!(json["array"][0]["array"][1]["room_ind"], 1);
    }
}
